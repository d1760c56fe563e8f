//! End-to-end tests: the real CLI path (config, TCP transport, session)
//! against an in-process fake controller.

use std::time::Duration;

use clap::Parser;
use sp108e_cli::{run, Cli};
use sp108e_protocol::{
    Challenge, ChallengeVerifier, CHECK_REPLY_PREAMBLE, CMD_CHECK_DEVICE, CMD_GET_DEVICE_NAME,
    CMD_SYNC,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const STATUS: [u8; 17] = [
    0x38, 0x01, 0xD3, 0x80, 0xFF, 0x00, 0x01, 0x2C, 0x00, 0x01, 0x10, 0x20, 0x30, 0x03, 0x00, 0x00,
    0x83,
];

#[derive(Clone, Copy, Default)]
struct Behavior {
    /// Flip the low bit of every device check answer.
    corrupt_checksum: bool,
}

/// Accept one connection, answer six-byte frames like a controller and
/// return every frame received once the client hangs up.
async fn spawn_device(behavior: Behavior) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut frames = Vec::new();
        let mut frame = [0u8; 6];

        while stream.read_exact(&mut frame).await.is_ok() {
            frames.push(frame.to_vec());
            let payload = [frame[1], frame[2], frame[3]];
            let reply: Vec<u8> = match frame[4] {
                CMD_SYNC => STATUS.to_vec(),
                CMD_GET_DEVICE_NAME => b"\0SP108E_fake".to_vec(),
                CMD_CHECK_DEVICE => {
                    let challenge = Challenge::from_le_bytes(payload);
                    let mut byte = ChallengeVerifier::expected_byte(challenge);
                    if behavior.corrupt_checksum {
                        byte ^= 0x01;
                    }
                    let mut reply = CHECK_REPLY_PREAMBLE.to_vec();
                    reply.push(byte);
                    reply
                }
                _ => Vec::new(),
            };
            if !reply.is_empty() {
                stream.write_all(&reply).await.unwrap();
            }
        }
        frames
    });

    (port, handle)
}

async fn run_cli(port: u16, args: &[&str]) -> (anyhow::Result<()>, String) {
    let port = port.to_string();
    let mut argv = vec![
        "sp108e",
        "--host",
        "127.0.0.1",
        "--port",
        port.as_str(),
        "--timeout-ms",
        "300",
    ];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();

    let mut out = Vec::new();
    let result = run::run(&cli, &mut out).await;
    (result, String::from_utf8(out).unwrap())
}

async fn frames(handle: JoinHandle<Vec<Vec<u8>>>) -> Vec<Vec<u8>> {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_status() {
    let (port, device) = spawn_device(Behavior::default()).await;

    let (result, text) = run_cli(port, &["status"]).await;
    result.unwrap();
    assert!(text.contains("mode = 211 static\n"));
    assert!(text.contains("speed = 128\n"));
    assert!(text.contains("dots_per_segment = 300\n"));
    assert!(!text.contains("warning"));

    assert_eq!(frames(device).await, vec![vec![0x38, 0, 0, 0, 0x10, 0x83]]);
}

#[tokio::test]
async fn test_silent_command_is_probed() {
    let (port, device) = spawn_device(Behavior::default()).await;

    let (result, text) = run_cli(port, &["--seed", "3", "brightness", "0x40"]).await;
    result.unwrap();
    assert!(text.starts_with("ok (device check 0x"));

    let frames = frames(device).await;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], vec![0x38, 0x40, 0, 0, 0x2A, 0x83]);
    assert_eq!(frames[1][4], CMD_CHECK_DEVICE);
}

#[tokio::test]
async fn test_mode_auto_uses_dedicated_opcode() {
    let (port, device) = spawn_device(Behavior::default()).await;

    run_cli(port, &["mode", "auto"]).await.0.unwrap();
    assert_eq!(frames(device).await[0], vec![0x38, 0, 0, 0, 0x06, 0x83]);
}

#[tokio::test]
async fn test_self_test_sequence() {
    let (port, device) = spawn_device(Behavior::default()).await;

    let (result, text) = run_cli(port, &["test1"]).await;
    result.unwrap();
    assert!(text.starts_with("self test passed\n"));

    assert_eq!(
        frames(device).await,
        vec![
            vec![0x38, 0xE5, 0x23, 0xD3, 0xD5, 0x83],
            vec![0x38, 0xC5, 0x1B, 0xA9, 0xD5, 0x83],
            vec![0x38, 0xD9, 0x0F, 0xBD, 0x10, 0x83],
        ]
    );
}

#[tokio::test]
async fn test_device_name() {
    let (port, device) = spawn_device(Behavior::default()).await;

    let (result, text) = run_cli(port, &["name"]).await;
    result.unwrap();
    assert_eq!(text, "Connected to SP108E_fake\n");
    frames(device).await;
}

#[tokio::test]
async fn test_checksum_mismatch_fails_the_command() {
    let (port, device) = spawn_device(Behavior {
        corrupt_checksum: true,
    })
    .await;

    let (result, _) = run_cli(port, &["check"]).await;
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("checksum mismatch"));
    frames(device).await;
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (result, _) = run_cli(port, &["status"]).await;
    assert!(result.is_err());
}
