//! Metric names recorded by the session.
//!
//! Only the names and descriptions live here. Installing a recorder (and an
//! exporter) is up to the application; without one the counters are no-ops.

use metrics::{describe_counter, Unit};

/// Frames written to the transport.
pub const FRAMES_SENT: &str = "sp108e.frames.sent";
/// Replies read from the transport.
pub const REPLIES_RECEIVED: &str = "sp108e.replies.received";
/// Device check probes issued after silent commands.
pub const PROBES: &str = "sp108e.probes";
/// Device check replies with a wrong checksum byte.
pub const CHECKSUM_MISMATCHES: &str = "sp108e.checksum.mismatches";
/// Sessions that lost byte alignment.
pub const DESYNCS: &str = "sp108e.session.desyncs";
/// Soft validation anomalies in status replies.
pub const DECODE_WARNINGS: &str = "sp108e.status.decode_warnings";

/// Register descriptions for every metric above.
pub fn describe_metrics() {
    describe_counter!(FRAMES_SENT, Unit::Count, "Frames written to the controller");
    describe_counter!(REPLIES_RECEIVED, Unit::Count, "Replies read from the controller");
    describe_counter!(PROBES, Unit::Count, "Device check probes after silent commands");
    describe_counter!(
        CHECKSUM_MISMATCHES,
        Unit::Count,
        "Device check replies with a wrong checksum"
    );
    describe_counter!(DESYNCS, Unit::Count, "Sessions marked desynchronized");
    describe_counter!(
        DECODE_WARNINGS,
        Unit::Count,
        "Out-of-range bytes in status replies"
    );
}
