//! Common types used in the protocol.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::constants::*;
use crate::error::ProtocolError;

/// An RGB triplet exactly as it goes on the wire.
///
/// No color-space conversion happens anywhere in the protocol; the channel
/// order the LEDs actually use is configured separately on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a color from three channel values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Get the wire bytes.
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(bytes: [u8; 3]) -> Self {
        Rgb::new(bytes[0], bytes[1], bytes[2])
    }
}

impl TryFrom<&[u8]> for Rgb {
    type Error = ProtocolError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        match slice {
            [r, g, b] => Ok(Rgb::new(*r, *g, *b)),
            _ => Err(ProtocolError::InvalidColor(slice.len())),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGB({}, {}, {})", self.r, self.g, self.b)
    }
}

/// The display mode byte as reported in the status reply and accepted by
/// the mode-change command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// One of the built-in multi-color patterns (`0..=179`).
    Pattern(u8),
    /// Single-color meteor.
    Meteor,
    /// Single-color breathing.
    Breathing,
    /// Single-color stack.
    Stack,
    /// Single-color flow.
    Flow,
    /// Single-color wave.
    Wave,
    /// Single-color flash.
    Flash,
    /// Single-color static.
    Static,
    /// Single-color catch-up.
    CatchUp,
    /// Stored custom effect.
    CustomEffect,
    /// Auto sequence through the multi-color patterns.
    Auto,
    /// A byte outside every known range.
    Unknown(u8),
}

impl DisplayMode {
    const NAMED: [(DisplayMode, &'static str); 10] = [
        (DisplayMode::Meteor, "meteor"),
        (DisplayMode::Breathing, "breathing"),
        (DisplayMode::Stack, "stack"),
        (DisplayMode::Flow, "flow"),
        (DisplayMode::Wave, "wave"),
        (DisplayMode::Flash, "flash"),
        (DisplayMode::Static, "static"),
        (DisplayMode::CatchUp, "catch-up"),
        (DisplayMode::CustomEffect, "custom_effect"),
        (DisplayMode::Auto, "auto"),
    ];

    /// The name used by the vendor app, if this mode has one.
    pub fn name(&self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(mode, _)| mode == self)
            .map(|(_, name)| *name)
    }

    /// Whether the device is known to accept this mode byte.
    pub fn is_known(&self) -> bool {
        !matches!(self, DisplayMode::Unknown(_))
    }

    /// Whether this mode takes its color from the color command.
    pub fn is_single_color(&self) -> bool {
        matches!(
            self,
            DisplayMode::Meteor
                | DisplayMode::Breathing
                | DisplayMode::Stack
                | DisplayMode::Flow
                | DisplayMode::Wave
                | DisplayMode::Flash
                | DisplayMode::Static
                | DisplayMode::CatchUp
        )
    }
}

impl From<u8> for DisplayMode {
    fn from(code: u8) -> Self {
        match code {
            0..=MODE_PATTERN_MAX => DisplayMode::Pattern(code),
            MODE_METEOR => DisplayMode::Meteor,
            MODE_BREATHING => DisplayMode::Breathing,
            MODE_STACK => DisplayMode::Stack,
            MODE_FLOW => DisplayMode::Flow,
            MODE_WAVE => DisplayMode::Wave,
            MODE_FLASH => DisplayMode::Flash,
            MODE_STATIC => DisplayMode::Static,
            MODE_CATCHUP => DisplayMode::CatchUp,
            MODE_CUSTOM_EFFECT => DisplayMode::CustomEffect,
            MODE_AUTO => DisplayMode::Auto,
            _ => DisplayMode::Unknown(code),
        }
    }
}

impl From<DisplayMode> for u8 {
    fn from(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Pattern(code) | DisplayMode::Unknown(code) => code,
            DisplayMode::Meteor => MODE_METEOR,
            DisplayMode::Breathing => MODE_BREATHING,
            DisplayMode::Stack => MODE_STACK,
            DisplayMode::Flow => MODE_FLOW,
            DisplayMode::Wave => MODE_WAVE,
            DisplayMode::Flash => MODE_FLASH,
            DisplayMode::Static => MODE_STATIC,
            DisplayMode::CatchUp => MODE_CATCHUP,
            DisplayMode::CustomEffect => MODE_CUSTOM_EFFECT,
            DisplayMode::Auto => MODE_AUTO,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = u8::from(*self);
        match self.name() {
            Some(name) => write!(f, "{} {}", code, name),
            None => write!(f, "{}", code),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    /// Accepts a mode name (`"static"`, `"auto"`, ...) or a decimal / `0x`
    /// hex number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((mode, _)) = Self::NAMED.iter().find(|(_, name)| name.eq_ignore_ascii_case(s)) {
            return Ok(*mode);
        }
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => s.parse::<u8>(),
        };
        parsed
            .map(DisplayMode::from)
            .map_err(|_| format!("unknown display mode: {s}"))
    }
}

impl Serialize for DisplayMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*self))
    }
}

/// A 24-bit challenge for the device check command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Challenge(u32);

impl Challenge {
    /// Largest representable challenge.
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create a challenge, rejecting values wider than 24 bits.
    pub fn new(value: u32) -> Result<Self, ProtocolError> {
        if value > Self::MAX {
            return Err(ProtocolError::InvalidChallenge(value));
        }
        Ok(Challenge(value))
    }

    /// Create a challenge from the low 24 bits of a random word.
    pub fn from_random(word: u32) -> Self {
        Challenge(word & Self::MAX)
    }

    /// Read a challenge back from its three payload bytes.
    pub fn from_le_bytes(bytes: [u8; 3]) -> Self {
        let [b0, b1, b2] = bytes;
        Challenge(u32::from_le_bytes([b0, b1, b2, 0]))
    }

    /// Get the numeric value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Payload bytes, little-endian across all three bytes.
    pub fn to_le_bytes(&self) -> [u8; 3] {
        let b = self.0.to_le_bytes();
        [b[0], b[1], b[2]]
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}
