//! SP108E Controller Protocol
//!
//! This crate provides types and utilities for talking to SP108E-class
//! addressable LED pixel controllers over their raw TCP socket (port 8189 by
//! default). The wire format was recovered from captured traffic; there is no
//! vendor documentation.
//!
//! # Protocol Overview
//!
//! Every command is a fixed 6-byte frame:
//!
//! ```text
//! +------+------------------+--------+------+
//! | 0x38 | payload[0..3]    | opcode | 0x83 |
//! +------+------------------+--------+------+
//! ```
//!
//! The device answers some opcodes and silently accepts others. There is no
//! sequence number or length prefix, so the host must keep strict request /
//! response lockstep. After every silent command the [`Session`] issues a
//! "check device" challenge and verifies the checksum byte in the reply to
//! confirm the byte stream is still aligned.
//!
//! - [`FrameCodec`] wraps payloads in the start/end markers.
//! - [`CommandCatalog`] records which opcodes reply, and with how many bytes.
//! - [`ChallengeVerifier`] reproduces the device's bit-mixing checksum.
//! - [`StatusReport`] decodes the 17-byte reply to the sync opcode.
//! - [`Session`] drives exchanges over any [`Transport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use sp108e_protocol::{Command, Session, SessionConfig};
//!
//! let mut session = Session::new(transport, SessionConfig::default());
//! session.execute(&Command::Brightness(128)).await?;
//! let report = session.status().await?;
//! println!("mode = {}", report.status.mode);
//! ```

mod checksum;
mod commands;
mod constants;
mod error;
mod frame;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod session;
mod status;
mod transport;
mod types;

pub use checksum::*;
pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use session::*;
pub use status::*;
pub use transport::*;
pub use types::*;
