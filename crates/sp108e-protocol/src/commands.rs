//! Commands that can be sent to the controller, and what is known about
//! how the controller answers each of them.

use std::fmt;

use tracing::warn;

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::{Frame, FrameCodec};
use crate::types::*;

/// Whether an opcode is known to produce a reply.
///
/// `Unknown` covers opcodes seen in captures that were never exercised long
/// enough to tell whether the device stays silent. Callers must handle it
/// explicitly; it is neither of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseExpectation {
    /// The device always replies.
    Responds,
    /// The device never replies.
    Silent,
    /// Not established.
    Unknown,
}

impl fmt::Display for ResponseExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseExpectation::Responds => write!(f, "responds"),
            ResponseExpectation::Silent => write!(f, "silent"),
            ResponseExpectation::Unknown => write!(f, "unknown"),
        }
    }
}

/// How the three payload bytes of an opcode are laid out.
///
/// Byte order is per opcode as observed on the wire; there is no general
/// rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadShape {
    /// All three bytes are zero.
    Empty,
    /// One byte in position 0.
    Byte,
    /// 16-bit little-endian value in positions 0..2.
    U16Le,
    /// 24-bit little-endian value across all three bytes.
    U24Le,
    /// Red, green, blue.
    Rgb,
    /// Shape not recovered; raw bytes are passed through.
    Opaque,
    /// Arbitrary length pixel stream (preview only).
    Pixels,
}

/// Everything known about one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Opcode byte.
    pub opcode: u8,
    /// Name used in logs.
    pub name: &'static str,
    /// Payload layout.
    pub payload: PayloadShape,
    /// Reply behavior.
    pub response: ResponseExpectation,
    /// Exact reply length, when the reply shape is fixed.
    pub reply_len: Option<usize>,
}

impl CommandDescriptor {
    const fn new(
        opcode: u8,
        name: &'static str,
        payload: PayloadShape,
        response: ResponseExpectation,
        reply_len: Option<usize>,
    ) -> Self {
        CommandDescriptor {
            opcode,
            name,
            payload,
            response,
            reply_len,
        }
    }
}

use self::PayloadShape as P;
use self::ResponseExpectation as R;

/// Sorted by opcode.
static CATALOG: [CommandDescriptor; 24] = [
    CommandDescriptor::new(CMD_CUSTOM_EFFECT, "custom_effect", P::Opaque, R::Unknown, None),
    CommandDescriptor::new(CMD_SPEED, "speed", P::Byte, R::Silent, None),
    CommandDescriptor::new(CMD_MODE_AUTO, "mode_auto", P::Empty, R::Silent, None),
    CommandDescriptor::new(CMD_CUSTOM_DELETE, "custom_delete", P::Opaque, R::Unknown, None),
    CommandDescriptor::new(CMD_WHITE_BRIGHTNESS, "white_brightness", P::Byte, R::Unknown, None),
    CommandDescriptor::new(CMD_SYNC, "sync", P::Empty, R::Responds, Some(STATUS_REPLY_LEN)),
    CommandDescriptor::new(CMD_SET_DEVICE_NAME, "set_device_name", P::Opaque, R::Unknown, None),
    CommandDescriptor::new(
        CMD_SET_DEVICE_PASSWORD,
        "set_device_password",
        P::Opaque,
        R::Unknown,
        None,
    ),
    CommandDescriptor::new(CMD_SET_IC_MODEL, "set_ic_model", P::Byte, R::Silent, None),
    CommandDescriptor::new(CMD_GET_RECORD_NUM, "get_record_num", P::Empty, R::Unknown, None),
    CommandDescriptor::new(CMD_COLOR, "color", P::Rgb, R::Silent, None),
    CommandDescriptor::new(CMD_CUSTOM_PREVIEW, "custom_preview", P::Pixels, R::Responds, Some(1)),
    CommandDescriptor::new(CMD_CHANGE_PAGE, "change_page", P::Opaque, R::Unknown, None),
    CommandDescriptor::new(CMD_BRIGHTNESS, "brightness", P::Byte, R::Silent, None),
    CommandDescriptor::new(CMD_MODE_CHANGE, "mode_change", P::Byte, R::Silent, None),
    CommandDescriptor::new(CMD_DOT_COUNT, "dot_count", P::U16Le, R::Silent, None),
    CommandDescriptor::new(CMD_SEC_COUNT, "sec_count", P::U16Le, R::Silent, None),
    CommandDescriptor::new(
        CMD_CHECK_DEVICE_IS_COOL,
        "check_device_is_cool",
        P::Opaque,
        R::Unknown,
        None,
    ),
    CommandDescriptor::new(CMD_SET_RGB_SEQ, "set_rgb_seq", P::Byte, R::Unknown, None),
    CommandDescriptor::new(CMD_CUSTOM_RECORD, "custom_record", P::Opaque, R::Unknown, None),
    CommandDescriptor::new(CMD_GET_DEVICE_NAME, "get_device_name", P::Empty, R::Responds, None),
    CommandDescriptor::new(
        CMD_SET_DEVICE_TO_AP_MODE,
        "set_device_to_ap_mode",
        P::Empty,
        R::Unknown,
        None,
    ),
    CommandDescriptor::new(CMD_TOGGLE_LAMP, "toggle_lamp", P::Empty, R::Unknown, None),
    CommandDescriptor::new(
        CMD_CHECK_DEVICE,
        "check_device",
        P::U24Le,
        R::Responds,
        Some(CHECK_REPLY_LEN),
    ),
];

/// The closed table of known opcodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandCatalog;

impl CommandCatalog {
    /// Look up the descriptor for an opcode.
    pub fn lookup(opcode: u8) -> Option<&'static CommandDescriptor> {
        CATALOG
            .binary_search_by_key(&opcode, |d| d.opcode)
            .ok()
            .map(|idx| &CATALOG[idx])
    }

    /// Reply behavior for an opcode; unrecognized opcodes are `Unknown`.
    pub fn expects_response(opcode: u8) -> ResponseExpectation {
        Self::lookup(opcode)
            .map(|d| d.response)
            .unwrap_or(ResponseExpectation::Unknown)
    }

    /// Exact reply length for an opcode, if fixed.
    pub fn reply_len(opcode: u8) -> Option<usize> {
        Self::lookup(opcode).and_then(|d| d.reply_len)
    }

    /// Name for logs; unrecognized opcodes render as hex.
    pub fn name(opcode: u8) -> String {
        match Self::lookup(opcode) {
            Some(d) => d.name.to_string(),
            None => format!("0x{:02X}", opcode),
        }
    }

    /// Iterate over every known opcode.
    pub fn iter() -> impl Iterator<Item = &'static CommandDescriptor> {
        CATALOG.iter()
    }
}

/// Commands that can be sent to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set the effect speed.
    Speed(u8),
    /// Set the global brightness.
    Brightness(u8),
    /// Set the color used by the single-color modes.
    Color(Rgb),
    /// Change the display mode. `Auto` goes out as the dedicated opcode.
    ModeChange(DisplayMode),
    /// Set the number of pixels per segment.
    DotCount(u16),
    /// Set the number of segments.
    SegmentCount(u16),
    /// Select the LED IC / wire protocol.
    SetIcModel(u8),
    /// Set the RGB channel order.
    SetRgbOrder(u8),
    /// Toggle the lamp on or off.
    ToggleLamp,
    /// Request the status reply.
    Sync,
    /// Request the device name.
    GetDeviceName,
    /// Challenge/response liveness check.
    CheckDevice(Challenge),
    /// Enter the live pixel preview.
    EnterPreview,
    /// Any opcode with up to three raw payload bytes.
    Raw {
        /// Opcode byte.
        opcode: u8,
        /// Payload bytes; padded to three.
        payload: Vec<u8>,
    },
}

impl Command {
    /// The opcode this command goes out with.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Speed(_) => CMD_SPEED,
            Command::Brightness(_) => CMD_BRIGHTNESS,
            Command::Color(_) => CMD_COLOR,
            Command::ModeChange(DisplayMode::Auto) => CMD_MODE_AUTO,
            Command::ModeChange(_) => CMD_MODE_CHANGE,
            Command::DotCount(_) => CMD_DOT_COUNT,
            Command::SegmentCount(_) => CMD_SEC_COUNT,
            Command::SetIcModel(_) => CMD_SET_IC_MODEL,
            Command::SetRgbOrder(_) => CMD_SET_RGB_SEQ,
            Command::ToggleLamp => CMD_TOGGLE_LAMP,
            Command::Sync => CMD_SYNC,
            Command::GetDeviceName => CMD_GET_DEVICE_NAME,
            Command::CheckDevice(_) => CMD_CHECK_DEVICE,
            Command::EnterPreview => CMD_CUSTOM_PREVIEW,
            Command::Raw { opcode, .. } => *opcode,
        }
    }

    /// The payload bytes before zero padding.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Command::Speed(v)
            | Command::Brightness(v)
            | Command::SetIcModel(v)
            | Command::SetRgbOrder(v) => vec![*v],
            Command::Color(rgb) => rgb.to_bytes().to_vec(),
            Command::ModeChange(DisplayMode::Auto) => Vec::new(),
            Command::ModeChange(mode) => vec![u8::from(*mode)],
            Command::DotCount(v) | Command::SegmentCount(v) => v.to_le_bytes().to_vec(),
            Command::CheckDevice(challenge) => challenge.to_le_bytes().to_vec(),
            Command::ToggleLamp
            | Command::Sync
            | Command::GetDeviceName
            | Command::EnterPreview => Vec::new(),
            Command::Raw { payload, .. } => payload.clone(),
        }
    }

    /// Encode to a wire frame.
    pub fn encode(&self) -> Result<Frame, ProtocolError> {
        match self {
            Command::DotCount(v) if *v == 0 || *v > DOT_COUNT_MAX => {
                warn!(
                    dots = *v,
                    max = DOT_COUNT_MAX,
                    reset_to = DOT_COUNT_RESET,
                    "dot count out of range; device will reset it"
                );
            }
            Command::ModeChange(mode) if !mode.is_known() => {
                warn!(mode = u8::from(*mode), "mode byte is outside every known range");
            }
            _ => {}
        }
        FrameCodec::encode(self.opcode(), Some(self.payload().as_slice()))
    }

    /// Reply behavior for this command.
    pub fn expects_response(&self) -> ResponseExpectation {
        CommandCatalog::expects_response(self.opcode())
    }
}

/// RGB values for a bulk preview frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewFrame {
    pixels: Vec<u8>,
}

impl PreviewFrame {
    /// Build a frame from one color per LED.
    pub fn from_colors(colors: &[Rgb]) -> Self {
        let mut pixels = Vec::with_capacity(colors.len() * 3);
        for color in colors {
            pixels.extend_from_slice(&color.to_bytes());
        }
        PreviewFrame { pixels }
    }

    /// Build a frame where every one of `count` LEDs has the same color.
    pub fn solid(color: Rgb, count: usize) -> Self {
        Self::from_colors(&vec![color; count])
    }

    /// Number of LEDs covered.
    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / 3
    }

    /// Encode to a wire frame.
    pub fn encode(&self) -> Frame {
        FrameCodec::encode_preview(&self.pixels)
    }
}

/// Decode the reply to [`CMD_GET_DEVICE_NAME`].
///
/// The device prefixes the name with a NUL byte.
pub fn decode_device_name(reply: &[u8]) -> String {
    let trimmed: Vec<u8> = reply.iter().copied().filter(|&b| b != 0).collect();
    String::from_utf8_lossy(&trimmed).trim().to_string()
}
