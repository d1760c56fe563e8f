//! Subcommand dispatch.

use std::io::Write;

use anyhow::{Context, Result};
use sp108e_protocol::{
    Command, DeviceStatus, Exchange, PreviewFrame, Rgb, Session, StatusReport, Transport,
};
use tracing::{info, warn};

use crate::cli::{Cli, Commands};
use crate::config::ClientConfig;
use crate::tcp::TcpTransport;

/// Resolve the config file and command line overrides.
pub fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.read_timeout_ms = timeout_ms;
    }
    Ok(config)
}

/// Connect, run one subcommand and disconnect, writing results to `out`.
pub async fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let config = resolve_config(cli)?;
    let addr = config.addr();
    let transport = TcpTransport::connect_with_timeout(&addr, config.connect_timeout())
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let mut session = match cli.seed {
        Some(seed) => Session::with_seed(transport, config.session_config(), seed),
        None => Session::new(transport, config.session_config()),
    };

    let result = dispatch(&mut session, &cli.command, out).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close connection");
    }
    result
}

/// Run one subcommand on an open session.
pub async fn dispatch<T: Transport, W: Write>(
    session: &mut Session<T>,
    command: &Commands,
    out: &mut W,
) -> Result<()> {
    match command {
        Commands::Status { json } => {
            let report = session.status().await.context("status request failed")?;
            if *json {
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
            } else {
                print_report(out, &report)?;
            }
        }
        Commands::Name => {
            let name = session.device_name().await.context("name request failed")?;
            writeln!(out, "Connected to {}", name)?;
        }
        Commands::Check => {
            let challenge = session.probe().await.context("device check failed")?;
            writeln!(out, "device check ok (challenge {})", challenge)?;
        }
        Commands::Speed { value } => execute(session, Command::Speed(*value), out).await?,
        Commands::Brightness { value } => {
            execute(session, Command::Brightness(*value), out).await?
        }
        Commands::Mode { mode } => execute(session, Command::ModeChange(*mode), out).await?,
        Commands::Color { r, g, b } => {
            execute(session, Command::Color(Rgb::new(*r, *g, *b)), out).await?
        }
        Commands::Dots { count } => execute(session, Command::DotCount(*count), out).await?,
        Commands::Segments { count } => {
            execute(session, Command::SegmentCount(*count), out).await?
        }
        Commands::IcModel { value } => execute(session, Command::SetIcModel(*value), out).await?,
        Commands::RgbOrder { value } => {
            execute(session, Command::SetRgbOrder(*value), out).await?
        }
        Commands::Lamp => execute(session, Command::ToggleLamp, out).await?,
        Commands::Test1 => {
            let report = session.self_test().await.context("self test failed")?;
            writeln!(out, "self test passed")?;
            print_report(out, &report)?;
        }
        Commands::Raw { opcode, payload } => {
            let command = Command::Raw {
                opcode: *opcode,
                payload: payload.clone(),
            };
            execute(session, command, out).await?
        }
        Commands::Preview {
            pixels,
            color,
            frames,
        } => {
            session.enter_preview().await.context("failed to enter preview")?;
            for frame in 0..*frames {
                session
                    .preview_frame(&chase_frame(*pixels, *color, frame))
                    .await
                    .with_context(|| format!("preview frame {} failed", frame))?;
            }
            info!(frames, pixels, "preview done");
            writeln!(out, "sent {} preview frame(s)", frames)?;
        }
    }
    Ok(())
}

async fn execute<T: Transport, W: Write>(
    session: &mut Session<T>,
    command: Command,
    out: &mut W,
) -> Result<()> {
    let exchange = session
        .execute(&command)
        .await
        .with_context(|| format!("{:?} failed", command))?;
    match exchange {
        Exchange::Reply(bytes) => writeln!(out, "< {}", hex::encode(bytes))?,
        Exchange::Confirmed(challenge) => writeln!(out, "ok (device check {})", challenge)?,
    }
    Ok(())
}

/// All pixels black except one, which moves one step per frame.
fn chase_frame(pixels: usize, color: Rgb, frame: usize) -> PreviewFrame {
    let mut colors = vec![Rgb::default(); pixels];
    if let Some(lit) = colors.get_mut(frame % pixels.max(1)) {
        *lit = color;
    }
    PreviewFrame::from_colors(&colors)
}

fn print_report<W: Write>(out: &mut W, report: &StatusReport) -> Result<()> {
    print_status(out, &report.status)?;
    for warning in &report.warnings {
        writeln!(out, "warning: {}", warning)?;
    }
    Ok(())
}

fn print_status<W: Write>(out: &mut W, status: &DeviceStatus) -> Result<()> {
    writeln!(out, "lamp = {}", if status.lamp_on { "on" } else { "off" })?;
    writeln!(out, "mode = {}", status.mode)?;
    writeln!(out, "speed = {}", status.speed)?;
    writeln!(out, "brightness = {}", status.brightness)?;
    writeln!(out, "rgb_order = {}", status.rgb_order)?;
    writeln!(out, "dots_per_segment = {}", status.dots_per_segment)?;
    writeln!(out, "segments = {}", status.segments)?;
    writeln!(out, "static_color = {}", status.static_color)?;
    writeln!(out, "ic_model = {}", status.ic_model)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp108e_protocol::mock::MockTransport;
    use sp108e_protocol::{SessionConfig, PREVIEW_ACK};

    const STATUS: [u8; 17] = [
        0x38, 0x01, 0xFC, 0x01, 0x0A, 0x02, 0x00, 0x3C, 0x00, 0x01, 0xB3, 0x00, 0xFF, 0x03, 0x00,
        0xFF, 0x83,
    ];

    async fn dispatch_to_string(mock: MockTransport, command: Commands) -> (String, MockTransport) {
        let mut session = Session::with_seed(mock, SessionConfig::default(), 1);
        let mut out = Vec::new();
        dispatch(&mut session, &command, &mut out).await.unwrap();
        (String::from_utf8(out).unwrap(), session.into_inner())
    }

    #[tokio::test]
    async fn test_status_text() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x38, 0x00, 0x00, 0x00, 0x10, 0x83], &STATUS);

        let (text, _) = dispatch_to_string(mock, Commands::Status { json: false }).await;
        assert!(text.contains("lamp = on\n"));
        assert!(text.contains("mode = 252 auto\n"));
        assert!(text.contains("dots_per_segment = 60\n"));
        assert!(text.contains("static_color = RGB(179, 0, 255)\n"));
        assert!(text.contains("warning: reserved byte 15 is 0xFF\n"));
    }

    #[tokio::test]
    async fn test_status_json() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x38, 0x00, 0x00, 0x00, 0x10, 0x83], &STATUS);

        let (text, _) = dispatch_to_string(mock, Commands::Status { json: true }).await;
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["status"]["mode"], 252);
        assert_eq!(value["status"]["static_color"]["r"], 179);
        assert_eq!(value["warnings"][0]["kind"], "reserved_non_zero");
    }

    #[tokio::test]
    async fn test_raw_prints_reply_hex() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x38, 0x00, 0x00, 0x00, 0x77, 0x83], b"\0ab");

        let (text, _) = dispatch_to_string(
            mock,
            Commands::Raw {
                opcode: 0x77,
                payload: vec![],
            },
        )
        .await;
        assert_eq!(text, "< 006162\n");
    }

    #[tokio::test]
    async fn test_preview_chases_one_pixel() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x38, 0x00, 0x00, 0x00, 0x24, 0x83], &[PREVIEW_ACK]);
        mock.expect(&[0x38, 9, 9, 9, 0, 0, 0, 0x24, 0x83], &[PREVIEW_ACK]);
        mock.expect(&[0x38, 0, 0, 0, 9, 9, 9, 0x24, 0x83], &[PREVIEW_ACK]);
        mock.expect(&[0x38, 9, 9, 9, 0, 0, 0, 0x24, 0x83], &[PREVIEW_ACK]);

        let (text, mock) = dispatch_to_string(
            mock,
            Commands::Preview {
                pixels: 2,
                color: Rgb::new(9, 9, 9),
                frames: 3,
            },
        )
        .await;
        assert_eq!(text, "sent 3 preview frame(s)\n");
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[test]
    fn test_overrides_beat_defaults() {
        use clap::Parser;
        let cli = Cli::try_parse_from([
            "sp108e",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--timeout-ms",
            "250",
            "lamp",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.addr(), "127.0.0.1:9000");
        assert_eq!(config.read_timeout_ms, 250);
    }
}
