// CLI definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use sp108e_protocol::{DisplayMode, Rgb};

#[derive(Debug, Parser)]
#[command(name = "sp108e")]
#[command(version, about = "Control an SP108E LED pixel controller over WiFi")]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML config file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Controller address (overrides config)
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Controller TCP port (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Per-reply timeout in milliseconds (overrides config)
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Seed for device check challenges (reproducible runs)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Show device status
    #[command(visible_alias = "sync")]
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show device name
    #[command(visible_alias = "get-device-name")]
    Name,

    /// Run one device check with a random challenge
    Check,

    /// Set effect speed
    Speed {
        #[arg(value_parser = parse_byte)]
        value: u8,
    },

    /// Set brightness
    Brightness {
        #[arg(value_parser = parse_byte)]
        value: u8,
    },

    /// Set display mode (name like 'static' or 'auto', or a number)
    Mode { mode: DisplayMode },

    /// Set the color for single-color modes
    Color {
        #[arg(value_parser = parse_byte)]
        r: u8,
        #[arg(value_parser = parse_byte)]
        g: u8,
        #[arg(value_parser = parse_byte)]
        b: u8,
    },

    /// Set pixels per segment
    Dots { count: u16 },

    /// Set number of segments
    Segments { count: u16 },

    /// Select LED IC model
    IcModel {
        #[arg(value_parser = parse_byte)]
        value: u8,
    },

    /// Set RGB channel order (0-5)
    RgbOrder {
        #[arg(value_parser = parse_byte)]
        value: u8,
    },

    /// Toggle the lamp on or off
    Lamp,

    /// Replay the recorded sanity sequence
    Test1,

    /// Send any opcode with up to three payload bytes
    #[command(visible_alias = "testcmd")]
    Raw {
        /// Opcode (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_byte)]
        opcode: u8,
        /// Payload bytes
        #[arg(value_parser = parse_byte, num_args = 0..=3)]
        payload: Vec<u8>,
    },

    /// Stream preview frames: one lit pixel chasing along the strip
    Preview {
        /// Number of LEDs
        #[arg(long, default_value_t = 60)]
        pixels: usize,
        /// Color as R,G,B
        #[arg(long, value_parser = parse_rgb, default_value = "255,255,255")]
        color: Rgb,
        /// Number of frames to send
        #[arg(long, default_value_t = 1)]
        frames: usize,
    },
}

/// Parse a byte as decimal or `0x` hex.
pub fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid byte '{}': {}", s, e))
}

/// Parse `R,G,B`.
pub fn parse_rgb(s: &str) -> Result<Rgb, String> {
    let parts = s
        .split(',')
        .map(|part| parse_byte(part.trim()))
        .collect::<Result<Vec<u8>, String>>()?;
    Rgb::try_from(parts.as_slice()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("0x2A"), Ok(0x2A));
        assert_eq!(parse_byte("42"), Ok(42));
        assert!(parse_byte("256").is_err());
        assert!(parse_byte("0xZZ").is_err());
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_rgb("179, 0, 0xFF"), Ok(Rgb::new(179, 0, 255)));
        assert!(parse_rgb("1,2").is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["sp108e", "status", "--json", "-H", "10.0.0.2", "-vv"]).unwrap();
        assert_eq!(cli.command, Commands::Status { json: true });
        assert_eq!(cli.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_mode_accepts_names_and_numbers() {
        let cli = Cli::try_parse_from(["sp108e", "mode", "static"]).unwrap();
        assert_eq!(cli.command, Commands::Mode { mode: DisplayMode::Static });
        let cli = Cli::try_parse_from(["sp108e", "mode", "12"]).unwrap();
        assert_eq!(cli.command, Commands::Mode { mode: DisplayMode::Pattern(12) });
    }

    #[test]
    fn test_raw_payload_limit() {
        let cli = Cli::try_parse_from(["sp108e", "raw", "0x77"]).unwrap();
        assert_eq!(cli.command, Commands::Raw { opcode: 0x77, payload: vec![] });
        assert!(Cli::try_parse_from(["sp108e", "raw", "1", "1", "2", "3", "4"]).is_err());
    }
}
