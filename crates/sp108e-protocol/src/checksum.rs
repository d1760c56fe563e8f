//! Device check challenge/response.
//!
//! The host sends a 24-bit challenge as the payload of [`CMD_CHECK_DEVICE`].
//! The device answers with a bare six byte payload (no frame markers): the
//! fixed preamble `01 02 03 04 05` followed by one byte mixed from selected
//! bits of the challenge.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::Challenge;

/// Computes and checks the device check reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChallengeVerifier;

impl ChallengeVerifier {
    /// The checksum byte the device returns for `challenge`.
    ///
    /// Bits 0,1,4,6 pass through, bits 8..14 move down to 2..8 and bits
    /// 21..24 move down to 0..3.
    pub fn expected_byte(challenge: Challenge) -> u8 {
        let c = challenge.value();
        let mixed = (c & 0x53) | ((c & 0x3F00) >> 6) | ((c & 0xE0_0000) >> 21);
        mixed as u8
    }

    /// Check a device check reply.
    ///
    /// Returns `Ok(false)` when only the checksum byte disagrees. A short
    /// reply or a wrong preamble is an error: the stream is no longer
    /// aligned with frame boundaries.
    pub fn verify(challenge: Challenge, reply: &[u8]) -> Result<bool, ProtocolError> {
        if reply.len() < CHECK_REPLY_LEN {
            return Err(ProtocolError::FrameTooShort {
                expected: CHECK_REPLY_LEN,
                actual: reply.len(),
            });
        }
        if reply[..CHECK_REPLY_PREAMBLE.len()] != CHECK_REPLY_PREAMBLE {
            return Err(ProtocolError::UnexpectedReply {
                expected: format!("device check preamble {}", hex::encode(CHECK_REPLY_PREAMBLE)),
                actual: reply.to_vec(),
            });
        }
        Ok(reply[CHECK_REPLY_PREAMBLE.len()] == Self::expected_byte(challenge))
    }

    /// Like [`verify`](Self::verify) but turns a wrong checksum into
    /// [`ProtocolError::ChecksumMismatch`].
    pub fn check(challenge: Challenge, reply: &[u8]) -> Result<(), ProtocolError> {
        if Self::verify(challenge, reply)? {
            Ok(())
        } else {
            Err(ProtocolError::ChecksumMismatch {
                challenge: challenge.value(),
                expected: Self::expected_byte(challenge),
                actual: reply[CHECK_REPLY_PREAMBLE.len()],
            })
        }
    }
}
