//! Protocol constants
//!
//! Opcodes were taken from the LEDshop Android app and confirmed against
//! packet captures. Only some of them have known payload shapes.

// ============================================================================
// Framing
// ============================================================================

/// First byte of every command frame and of the status reply.
pub const FRAME_START: u8 = 0x38;
/// Last byte of every command frame and of the status reply.
pub const FRAME_END: u8 = 0x83;
/// Number of payload bytes in a standard command frame.
pub const PAYLOAD_LEN: usize = 3;
/// Total length of a standard command frame.
pub const COMMAND_FRAME_LEN: usize = PAYLOAD_LEN + 3;

// ============================================================================
// Command Codes (host → controller)
// ============================================================================

/// Select a stored custom effect.
pub const CMD_CUSTOM_EFFECT: u8 = 0x02;
/// Set the speed of the running effect.
pub const CMD_SPEED: u8 = 0x03;
/// Cycle automatically through the multi-color modes.
pub const CMD_MODE_AUTO: u8 = 0x06;
/// Delete a stored custom effect.
pub const CMD_CUSTOM_DELETE: u8 = 0x07;
/// Set the white channel brightness.
pub const CMD_WHITE_BRIGHTNESS: u8 = 0x08;
/// Request the 17-byte status reply.
pub const CMD_SYNC: u8 = 0x10;
/// Set the advertised device name.
pub const CMD_SET_DEVICE_NAME: u8 = 0x14;
/// Set the device password.
pub const CMD_SET_DEVICE_PASSWORD: u8 = 0x16;
/// Select the LED IC / wire protocol.
pub const CMD_SET_IC_MODEL: u8 = 0x1C;
/// Query the number of stored custom records.
pub const CMD_GET_RECORD_NUM: u8 = 0x20;
/// Set the color used by the single-color modes.
pub const CMD_COLOR: u8 = 0x22;
/// Enter (or feed) the live pixel preview.
pub const CMD_CUSTOM_PREVIEW: u8 = 0x24;
/// Change the displayed page of custom effects.
pub const CMD_CHANGE_PAGE: u8 = 0x25;
/// Set the global brightness.
pub const CMD_BRIGHTNESS: u8 = 0x2A;
/// Change the display mode.
pub const CMD_MODE_CHANGE: u8 = 0x2C;
/// Set the number of pixels per segment.
pub const CMD_DOT_COUNT: u8 = 0x2D;
/// Set the number of segments.
pub const CMD_SEC_COUNT: u8 = 0x2E;
/// Unknown "is cool" device check used by the app.
pub const CMD_CHECK_DEVICE_IS_COOL: u8 = 0x2F;
/// Set the RGB channel order.
pub const CMD_SET_RGB_SEQ: u8 = 0x3C;
/// Record a custom effect.
pub const CMD_CUSTOM_RECORD: u8 = 0x4C;
/// Request the device name.
pub const CMD_GET_DEVICE_NAME: u8 = 0x77;
/// Switch the controller to access-point mode.
pub const CMD_SET_DEVICE_TO_AP_MODE: u8 = 0x88;
/// Toggle the lamp on or off.
pub const CMD_TOGGLE_LAMP: u8 = 0xAA;
/// Challenge/response liveness check.
pub const CMD_CHECK_DEVICE: u8 = 0xD5;

// ============================================================================
// Replies (controller → host)
// ============================================================================

/// Length of the status reply to [`CMD_SYNC`].
pub const STATUS_REPLY_LEN: usize = 17;
/// Length of the reply to [`CMD_CHECK_DEVICE`].
pub const CHECK_REPLY_LEN: usize = 6;
/// Fixed preamble of the [`CMD_CHECK_DEVICE`] reply.
pub const CHECK_REPLY_PREAMBLE: [u8; 5] = [1, 2, 3, 4, 5];
/// Single-byte acknowledgment for each preview frame.
pub const PREVIEW_ACK: u8 = 0x31;

// ============================================================================
// Display Modes
// ============================================================================

/// Highest numbered built-in multi-color pattern.
pub const MODE_PATTERN_MAX: u8 = 179;
/// Single-color meteor.
pub const MODE_METEOR: u8 = 205;
/// Single-color breathing.
pub const MODE_BREATHING: u8 = 206;
/// Single-color stack.
pub const MODE_STACK: u8 = 207;
/// Single-color flow.
pub const MODE_FLOW: u8 = 208;
/// Single-color wave.
pub const MODE_WAVE: u8 = 209;
/// Single-color flash.
pub const MODE_FLASH: u8 = 210;
/// Single-color static.
pub const MODE_STATIC: u8 = 211;
/// Single-color catch-up.
pub const MODE_CATCHUP: u8 = 212;
/// Stored custom effect.
pub const MODE_CUSTOM_EFFECT: u8 = 219;
/// Auto sequence through all the multi-color modes.
pub const MODE_AUTO: u8 = 0xFC;

// ============================================================================
// Limits
// ============================================================================

/// Highest RGB channel-order code seen in status replies.
pub const RGB_ORDER_MAX: u8 = 5;
/// Highest IC model code seen in status replies.
pub const IC_MODEL_MAX: u8 = 0x1C;
/// Dots-per-segment values outside `1..=DOT_COUNT_MAX` are reset by the
/// device to [`DOT_COUNT_RESET`].
pub const DOT_COUNT_MAX: u16 = 0x697;
/// Value the device falls back to for an out-of-range dot count.
pub const DOT_COUNT_RESET: u16 = 0x32;
/// Default TCP port of the controller.
pub const DEFAULT_PORT: u16 = 8189;
/// Default address of the controller in access-point mode.
pub const DEFAULT_HOST: &str = "192.168.4.1";
