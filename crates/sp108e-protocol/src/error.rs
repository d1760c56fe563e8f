//! Protocol error types.

use thiserror::Error;

/// Errors produced while encoding or decoding protocol bytes.
///
/// These never involve I/O. Any of the framing variants seen on a live
/// connection means the byte stream can no longer be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// More than three payload bytes were given for a standard frame.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed payload length.
        max: usize,
        /// Length supplied by the caller.
        actual: usize,
    },

    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Start or end marker is missing.
    #[error(
        "framing error: expected {expected_start:02X}..{expected_end:02X}, \
         got {actual_start:02X}..{actual_end:02X}"
    )]
    Framing {
        /// Required first byte.
        expected_start: u8,
        /// Required last byte.
        expected_end: u8,
        /// First byte received.
        actual_start: u8,
        /// Last byte received.
        actual_end: u8,
    },

    /// The device sent bytes that do not fit the reply shape for the command.
    #[error("unexpected reply: expected {expected}, got {}", hex::encode(.actual))]
    UnexpectedReply {
        /// Description of what was expected.
        expected: String,
        /// Bytes actually received.
        actual: Vec<u8>,
    },

    /// Device check checksum did not match the challenge.
    #[error(
        "checksum mismatch for challenge 0x{challenge:06X}: \
         expected 0x{expected:02X}, got 0x{actual:02X}"
    )]
    ChecksumMismatch {
        /// Challenge that was sent.
        challenge: u32,
        /// Checksum computed locally.
        expected: u8,
        /// Checksum returned by the device.
        actual: u8,
    },

    /// RGB values must be exactly three bytes.
    #[error("invalid color: expected 3 bytes, got {0}")]
    InvalidColor(usize),

    /// Challenges are 24-bit values.
    #[error("invalid challenge: 0x{0:X} does not fit in 24 bits")]
    InvalidChallenge(u32),
}

/// Errors from a [`Session`](crate::Session) exchange.
///
/// Wraps [`ProtocolError`] and adds the transport-level failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Encoding or decoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No reply arrived before the read deadline.
    #[error("timeout waiting for reply")]
    Timeout,

    /// The peer closed the connection.
    #[error("connection lost")]
    ConnectionLost,

    /// The transport has been closed.
    #[error("not connected")]
    NotConnected,

    /// A transport-specific failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// An earlier exchange lost byte alignment; the session must be reopened.
    #[error("session is desynchronized; reconnect before issuing more commands")]
    Desynchronized,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether this error means the byte stream is no longer aligned.
    ///
    /// Transport failures count: a write that fails partway may have left
    /// part of a frame on the wire.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Protocol(ProtocolError::Framing { .. })
                | SessionError::Protocol(ProtocolError::FrameTooShort { .. })
                | SessionError::Protocol(ProtocolError::UnexpectedReply { .. })
                | SessionError::ConnectionLost
                | SessionError::Transport(_)
                | SessionError::Io(_)
                | SessionError::Desynchronized
        )
    }
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
