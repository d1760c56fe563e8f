//! Decoding of the 17-byte reply to the sync command.
//!
//! ```text
//! offset  0     1     2     3     4      5      6..8     8..10   10..13  13    14    15    16
//!       +-----+-----+-----+-----+------+------+--------+-------+-------+-----+-----+-----+-----+
//!       | 38  |lamp |mode |speed|bright|order |dots BE |segs BE| color | ic  | r14 | r15 | 83  |
//!       +-----+-----+-----+-----+------+------+--------+-------+-------+-----+-----+-----+-----+
//! ```
//!
//! Several bytes have a known legal range but no known meaning. They are
//! checked and reported as [`DecodeWarning`]s; they never make the decode
//! fail, since firmware variants disagree on them.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::FrameCodec;
use crate::types::{DisplayMode, Rgb};

/// Offset of the first reserved byte.
pub const RESERVED_A_OFFSET: usize = 14;
/// Offset of the second reserved byte (seen as 0xFF on some units).
pub const RESERVED_B_OFFSET: usize = 15;

/// Decoded device state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    /// Lamp on/off.
    pub lamp_on: bool,
    /// Current display mode.
    pub mode: DisplayMode,
    /// Effect speed.
    pub speed: u8,
    /// Global brightness.
    pub brightness: u8,
    /// RGB channel-order code.
    pub rgb_order: u8,
    /// Pixels per segment.
    pub dots_per_segment: u16,
    /// Number of segments.
    pub segments: u16,
    /// Color used by the single-color modes.
    pub static_color: Rgb,
    /// LED IC / wire protocol code.
    pub ic_model: u8,
    /// Bytes 14 and 15, not interpreted.
    pub reserved: [u8; 2],
}

/// A soft validation failure on an otherwise decodable status reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    /// Mode byte is outside every known range.
    UnknownMode {
        /// Raw mode byte.
        value: u8,
    },
    /// RGB order code above [`RGB_ORDER_MAX`].
    RgbOrderOutOfRange {
        /// Raw byte.
        value: u8,
    },
    /// IC model code above [`IC_MODEL_MAX`].
    IcModelOutOfRange {
        /// Raw byte.
        value: u8,
    },
    /// Dots per segment outside `1..=DOT_COUNT_MAX`.
    DotCountOutOfRange {
        /// Decoded value.
        value: u16,
    },
    /// A reserved byte was not zero.
    ReservedNonZero {
        /// Byte offset in the reply.
        offset: usize,
        /// Raw byte.
        value: u8,
    },
    /// Bytes followed the end marker.
    TrailingBytes {
        /// Total reply length.
        len: usize,
    },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::UnknownMode { value } => write!(f, "unknown mode byte {}", value),
            DecodeWarning::RgbOrderOutOfRange { value } => {
                write!(f, "rgb order {} above {}", value, RGB_ORDER_MAX)
            }
            DecodeWarning::IcModelOutOfRange { value } => {
                write!(f, "ic model 0x{:02X} above 0x{:02X}", value, IC_MODEL_MAX)
            }
            DecodeWarning::DotCountOutOfRange { value } => {
                write!(f, "dots per segment {} outside 1..={}", value, DOT_COUNT_MAX)
            }
            DecodeWarning::ReservedNonZero { offset, value } => {
                write!(f, "reserved byte {} is 0x{:02X}", offset, value)
            }
            DecodeWarning::TrailingBytes { len } => {
                write!(f, "status reply is {} bytes, expected {}", len, STATUS_REPLY_LEN)
            }
        }
    }
}

/// A decoded status reply together with any anomalies found in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// The decoded fields.
    pub status: DeviceStatus,
    /// Soft validation failures.
    pub warnings: Vec<DecodeWarning>,
}

impl StatusReport {
    /// Decode a status reply.
    ///
    /// Fails only on length and framing: the first byte must be the start
    /// marker, and both byte 16 and the last byte of `data` must be the end
    /// marker. Out-of-range values in the partially understood bytes come
    /// back as warnings.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < STATUS_REPLY_LEN {
            return Err(ProtocolError::FrameTooShort {
                expected: STATUS_REPLY_LEN,
                actual: data.len(),
            });
        }
        FrameCodec::decode(data)?;
        // A longer reply must still carry the end marker where the status
        // frame ends; only then are the extra bytes trailing.
        if data[STATUS_REPLY_LEN - 1] != FRAME_END {
            return Err(ProtocolError::Framing {
                expected_start: FRAME_START,
                expected_end: FRAME_END,
                actual_start: data[0],
                actual_end: data[STATUS_REPLY_LEN - 1],
            });
        }

        let status = DeviceStatus {
            lamp_on: data[1] != 0,
            mode: DisplayMode::from(data[2]),
            speed: data[3],
            brightness: data[4],
            rgb_order: data[5],
            dots_per_segment: u16::from_be_bytes([data[6], data[7]]),
            segments: u16::from_be_bytes([data[8], data[9]]),
            static_color: Rgb::new(data[10], data[11], data[12]),
            ic_model: data[13],
            reserved: [data[RESERVED_A_OFFSET], data[RESERVED_B_OFFSET]],
        };

        let warnings = validate(&status, data.len());
        for warning in &warnings {
            warn!(%warning, "status reply anomaly");
        }

        Ok(StatusReport { status, warnings })
    }

    /// Whether every checked byte was in range.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

fn validate(status: &DeviceStatus, len: usize) -> Vec<DecodeWarning> {
    let mut warnings = Vec::new();

    if let DisplayMode::Unknown(value) = status.mode {
        warnings.push(DecodeWarning::UnknownMode { value });
    }
    if status.rgb_order > RGB_ORDER_MAX {
        warnings.push(DecodeWarning::RgbOrderOutOfRange {
            value: status.rgb_order,
        });
    }
    if status.ic_model > IC_MODEL_MAX {
        warnings.push(DecodeWarning::IcModelOutOfRange {
            value: status.ic_model,
        });
    }
    if status.dots_per_segment == 0 || status.dots_per_segment > DOT_COUNT_MAX {
        warnings.push(DecodeWarning::DotCountOutOfRange {
            value: status.dots_per_segment,
        });
    }
    for (offset, value) in [RESERVED_A_OFFSET, RESERVED_B_OFFSET]
        .into_iter()
        .zip(status.reserved)
    {
        if value != 0 {
            warnings.push(DecodeWarning::ReservedNonZero { offset, value });
        }
    }
    if len > STATUS_REPLY_LEN {
        warnings.push(DecodeWarning::TrailingBytes { len });
    }

    warnings
}
