//! Frame encoding/decoding utilities.
//!
//! Every command is wrapped between a start and an end marker. Standard
//! commands carry exactly three payload bytes; the preview command carries
//! the raw pixel stream instead.
//!
//! ```text
//! +------+-----------------+--------+------+
//! | 0x38 | payload[0..N]   | opcode | 0x83 |
//! +------+-----------------+--------+------+
//! ```
//!
//! The status reply uses the same markers but has no opcode byte; its body
//! is interpreted by [`StatusReport`](crate::StatusReport).

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::*;
use crate::error::ProtocolError;

/// An immutable, marker-delimited byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// The full wire bytes, markers included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total length on the wire.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Frames always hold at least the two markers.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Everything between the start and end markers.
    pub fn body(&self) -> &[u8] {
        &self.bytes[1..self.bytes.len() - 1]
    }

    /// The opcode, i.e. the byte just before the end marker.
    pub fn opcode(&self) -> Option<u8> {
        self.body().last().copied()
    }

    /// The payload, i.e. the body without the trailing opcode.
    pub fn payload(&self) -> &[u8] {
        let body = self.body();
        &body[..body.len().saturating_sub(1)]
    }

    /// Hex rendering for logs.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Stateless encoder/decoder for the command envelope.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a standard 6-byte command frame.
    ///
    /// A missing payload becomes three zero bytes, a short one is padded
    /// on the right with zeros. More than three bytes is rejected before
    /// anything reaches the wire.
    pub fn encode(opcode: u8, payload: Option<&[u8]>) -> Result<Frame, ProtocolError> {
        let payload = payload.unwrap_or(&[]);
        if payload.len() > PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLong {
                max: PAYLOAD_LEN,
                actual: payload.len(),
            });
        }

        let mut buf = BytesMut::with_capacity(COMMAND_FRAME_LEN);
        buf.put_u8(FRAME_START);
        buf.put_slice(payload);
        buf.put_bytes(0, PAYLOAD_LEN - payload.len());
        buf.put_u8(opcode);
        buf.put_u8(FRAME_END);

        Ok(Frame { bytes: buf.freeze() })
    }

    /// Encode a bulk preview frame, wrapping `pixels` unchanged.
    ///
    /// There is no length limit here; the pixel buffer is typically three
    /// bytes per LED.
    pub fn encode_preview(pixels: &[u8]) -> Frame {
        let mut buf = BytesMut::with_capacity(pixels.len() + 3);
        buf.put_u8(FRAME_START);
        buf.put_slice(pixels);
        buf.put_u8(CMD_CUSTOM_PREVIEW);
        buf.put_u8(FRAME_END);

        Frame { bytes: buf.freeze() }
    }

    /// Validate the markers of a received frame.
    ///
    /// The payload is not interpreted.
    pub fn decode(data: &[u8]) -> Result<Frame, ProtocolError> {
        // start + opcode + end
        if data.len() < 3 {
            return Err(ProtocolError::FrameTooShort {
                expected: 3,
                actual: data.len(),
            });
        }

        let first = data[0];
        let last = data[data.len() - 1];
        if first != FRAME_START || last != FRAME_END {
            return Err(ProtocolError::Framing {
                expected_start: FRAME_START,
                expected_end: FRAME_END,
                actual_start: first,
                actual_end: last,
            });
        }

        Ok(Frame {
            bytes: Bytes::copy_from_slice(data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_vectors() {
        let frame = FrameCodec::encode(0x7F, None).unwrap();
        assert_eq!(frame.as_bytes(), &[0x38, 0x00, 0x00, 0x00, 0x7F, 0x83]);

        let frame = FrameCodec::encode(0x0F, Some(&[0x80][..])).unwrap();
        assert_eq!(frame.as_bytes(), &[0x38, 0x80, 0x00, 0x00, 0x0F, 0x83]);

        let frame = FrameCodec::encode(0x01, Some(&[0x01, 0x20, 0x44][..])).unwrap();
        assert_eq!(frame.as_bytes(), &[0x38, 0x01, 0x20, 0x44, 0x01, 0x83]);
    }

    #[test]
    fn test_encode_rejects_long_payload() {
        let err = FrameCodec::encode(0x04, Some(&[1, 2, 3, 4][..])).unwrap_err();
        assert_eq!(err, ProtocolError::PayloadTooLong { max: 3, actual: 4 });
    }

    #[test]
    fn test_decode_recovers_opcode_and_padded_payload() {
        for payload in [&[][..], &[0xAA][..], &[0xAA, 0xBB][..], &[0xAA, 0xBB, 0xCC][..]] {
            let encoded = FrameCodec::encode(0x2C, Some(payload)).unwrap();
            let decoded = FrameCodec::decode(encoded.as_bytes()).unwrap();

            let mut padded = payload.to_vec();
            padded.resize(PAYLOAD_LEN, 0);
            assert_eq!(decoded.opcode(), Some(0x2C));
            assert_eq!(decoded.payload(), padded.as_slice());
            assert_eq!(decoded, encoded);
        }
    }

    #[test]
    fn test_encode_preview_wraps_pixels_unchanged() {
        let pixels: Vec<u8> = (0..=255).collect();
        let frame = FrameCodec::encode_preview(&pixels);
        assert_eq!(frame.len(), pixels.len() + 3);
        assert_eq!(frame.as_bytes()[0], FRAME_START);
        assert_eq!(frame.payload(), pixels.as_slice());
        assert_eq!(frame.opcode(), Some(CMD_CUSTOM_PREVIEW));
        assert_eq!(*frame.as_bytes().last().unwrap(), FRAME_END);
    }

    #[test]
    fn test_decode_rejects_bad_markers() {
        let err = FrameCodec::decode(&[0x01, 0x02, 0x03, 0x04, 0x05, 0xCF]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Framing {
                expected_start: 0x38,
                expected_end: 0x83,
                actual_start: 0x01,
                actual_end: 0xCF,
            }
        );

        assert!(matches!(
            FrameCodec::decode(&[0x38, 0x00, 0x00, 0x00, 0x10, 0x84]),
            Err(ProtocolError::Framing { actual_end: 0x84, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert_eq!(
            FrameCodec::decode(&[]),
            Err(ProtocolError::FrameTooShort { expected: 3, actual: 0 })
        );
        assert_eq!(
            FrameCodec::decode(&[0x38, 0x83]),
            Err(ProtocolError::FrameTooShort { expected: 3, actual: 2 })
        );
    }
}
