//! Half-duplex transaction driver.
//!
//! A [`Session`] owns one [`Transport`] and keeps the request/reply stream
//! in lockstep. There is no correlation id on the wire, so every reply is
//! taken to answer the most recent request, and at most one request is in
//! flight.
//!
//! How a command is driven depends on what [`CommandCatalog`] knows about
//! its opcode:
//!
//! | Expectation | Behavior                                                   |
//! |-------------|------------------------------------------------------------|
//! | Responds    | write, then read the reply (exact length when known)       |
//! | Silent      | write, then one device check probe                         |
//! | Unknown     | write, then read; on silence optionally fall back to probe |
//!
//! Device checks and preview entry are checked the same way wherever they
//! come from: a check reply goes through [`ChallengeVerifier`] and the
//! preview opcode must be answered with the one-byte ack.
//!
//! Any error that means the byte stream can no longer be trusted marks the
//! session [`SessionState::Desynchronized`]. Every later call fails with
//! [`SessionError::Desynchronized`] until the caller reconnects.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

use crate::checksum::ChallengeVerifier;
use crate::commands::{
    decode_device_name, Command, CommandCatalog, PreviewFrame, ResponseExpectation,
};
use crate::constants::*;
use crate::error::{ProtocolError, SessionError, SessionResult};
use crate::frame::{Frame, FrameCodec};
use crate::metrics as metric_names;
use crate::status::StatusReport;
use crate::transport::Transport;
use crate::types::{Challenge, Rgb};

/// Default deadline for one reply.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Read size when the reply length is not known up front.
const READ_CHUNK: usize = 4096;

/// Session tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Deadline for each reply.
    pub read_timeout: Duration,
    /// When a command with unknown reply behavior gets no bytes before the
    /// deadline, treat it as silent and run a device check instead of
    /// failing with a timeout.
    pub probe_unknown_silence: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            read_timeout: DEFAULT_READ_TIMEOUT,
            probe_unknown_silence: true,
        }
    }
}

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Request and reply streams are aligned.
    Ready,
    /// Alignment was lost; the connection must be reopened.
    Desynchronized,
    /// [`Session::close`] was called.
    Closed,
}

/// Outcome of [`Session::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// The device answered with these bytes.
    Reply(Vec<u8>),
    /// A device check with this challenge passed. Either the command was
    /// itself a device check, or the device stayed silent and the check
    /// confirmed the stream is still aligned.
    Confirmed(Challenge),
}

impl Exchange {
    /// Reply bytes, if the device answered.
    pub fn reply(&self) -> Option<&[u8]> {
        match self {
            Exchange::Reply(bytes) => Some(bytes.as_slice()),
            Exchange::Confirmed(_) => None,
        }
    }
}

/// One step of the recorded sanity sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestStep {
    /// Opcode sent.
    pub opcode: u8,
    /// Payload sent.
    pub payload: [u8; PAYLOAD_LEN],
}

/// Exchange recorded from the vendor app: two device checks with known
/// answers (0xCF and 0x6D), then a sync. The sync payload is ignored by
/// the device.
pub const SELF_TEST_SEQUENCE: [SelfTestStep; 3] = [
    SelfTestStep {
        opcode: CMD_CHECK_DEVICE,
        payload: [0xE5, 0x23, 0xD3],
    },
    SelfTestStep {
        opcode: CMD_CHECK_DEVICE,
        payload: [0xC5, 0x1B, 0xA9],
    },
    SelfTestStep {
        opcode: CMD_SYNC,
        payload: [0xD9, 0x0F, 0xBD],
    },
];

/// A connection to one controller.
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    rng: ChaCha8Rng,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    /// Create a session with challenges drawn from OS entropy.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self::with_rng(transport, config, ChaCha8Rng::from_entropy())
    }

    /// Create a session with a reproducible challenge sequence.
    pub fn with_seed(transport: T, config: SessionConfig, seed: u64) -> Self {
        Self::with_rng(transport, config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(transport: T, config: SessionConfig, rng: ChaCha8Rng) -> Self {
        Session {
            transport,
            config,
            rng,
            state: SessionState::Ready,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session tunables.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give back the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Encode and write one frame without reading anything.
    ///
    /// No probe follows. If the opcode does reply, the reply stays in the
    /// stream and will be read as the answer to the next request; use
    /// [`execute`](Self::execute) unless that is what you want.
    pub async fn send(&mut self, opcode: u8, payload: Option<&[u8]>) -> SessionResult<()> {
        self.ensure_ready()?;
        let frame = FrameCodec::encode(opcode, payload)?;
        let written = self.write_frame(&frame).await;
        self.settle(written, false)
    }

    /// Encode, write and read the reply.
    ///
    /// Reads exactly the catalog reply length when one is known, otherwise
    /// whatever a single read returns. A timeout desynchronizes the session,
    /// since a late reply would be taken as the answer to the next request.
    pub async fn send_and_await(
        &mut self,
        opcode: u8,
        payload: Option<&[u8]>,
    ) -> SessionResult<Vec<u8>> {
        self.ensure_ready()?;
        let frame = FrameCodec::encode(opcode, payload)?;
        let reply = self.round_trip(&frame, opcode).await;
        self.settle(reply, true)
    }

    /// Drive one command according to its catalog expectation.
    ///
    /// A device check, raw or typed, is verified like
    /// [`check_device`](Self::check_device). Entering preview must be
    /// acknowledged like [`enter_preview`](Self::enter_preview).
    pub async fn execute(&mut self, command: &Command) -> SessionResult<Exchange> {
        self.ensure_ready()?;
        let frame = command.encode()?;
        let opcode = command.opcode();

        match opcode {
            CMD_CHECK_DEVICE => {
                let payload: [u8; PAYLOAD_LEN] = frame.payload().try_into().map_err(|_| {
                    ProtocolError::FrameTooShort {
                        expected: COMMAND_FRAME_LEN,
                        actual: frame.len(),
                    }
                })?;
                let challenge = Challenge::from_le_bytes(payload);
                self.check_device(challenge).await?;
                return Ok(Exchange::Confirmed(challenge));
            }
            CMD_CUSTOM_PREVIEW => {
                let reply = self.round_trip(&frame, opcode).await;
                let reply = self.settle(reply, true)?;
                self.expect_ack(&reply)?;
                return Ok(Exchange::Reply(reply));
            }
            _ => {}
        }

        match CommandCatalog::expects_response(opcode) {
            ResponseExpectation::Responds => {
                let reply = self.round_trip(&frame, opcode).await;
                self.settle(reply, true).map(Exchange::Reply)
            }
            ResponseExpectation::Silent => {
                let written = self.write_frame(&frame).await;
                self.settle(written, false)?;
                self.probe().await.map(Exchange::Confirmed)
            }
            ResponseExpectation::Unknown => self.execute_unknown(&frame, opcode).await,
        }
    }

    async fn execute_unknown(&mut self, frame: &Frame, opcode: u8) -> SessionResult<Exchange> {
        let written = self.write_frame(frame).await;
        self.settle(written, false)?;

        match self.read_reply(opcode).await {
            Ok(reply) => Ok(Exchange::Reply(reply)),
            Err(SessionError::Timeout) if self.config.probe_unknown_silence => {
                warn!(
                    opcode = %CommandCatalog::name(opcode),
                    "no reply to command with unknown reply behavior, probing"
                );
                self.probe().await.map(Exchange::Confirmed)
            }
            Err(e) => self.settle(Err(e), true),
        }
    }

    /// Run one device check with a fresh random challenge.
    pub async fn probe(&mut self) -> SessionResult<Challenge> {
        self.ensure_ready()?;
        let challenge = Challenge::from_random(self.rng.gen::<u32>());
        ::metrics::counter!(metric_names::PROBES).increment(1);
        self.check_device(challenge).await?;
        Ok(challenge)
    }

    /// Run one device check with the given challenge.
    ///
    /// A wrong checksum byte is returned as
    /// [`ProtocolError::ChecksumMismatch`] and leaves the session usable;
    /// a wrong preamble or short reply desynchronizes it.
    pub async fn check_device(&mut self, challenge: Challenge) -> SessionResult<()> {
        self.ensure_ready()?;
        let frame = Command::CheckDevice(challenge).encode()?;
        let reply = self.round_trip(&frame, CMD_CHECK_DEVICE).await;
        let reply = self.settle(reply, true)?;

        match ChallengeVerifier::check(challenge, &reply) {
            Ok(()) => {
                debug!(%challenge, "device check passed");
                Ok(())
            }
            Err(e @ ProtocolError::ChecksumMismatch { .. }) => {
                ::metrics::counter!(metric_names::CHECKSUM_MISMATCHES).increment(1);
                warn!(%challenge, error = %e, "device check failed");
                Err(e.into())
            }
            Err(e) => self.settle(Err(e.into()), true),
        }
    }

    /// Request and decode the status reply.
    pub async fn status(&mut self) -> SessionResult<StatusReport> {
        let reply = self.send_and_await(CMD_SYNC, None).await?;
        self.decode_status(&reply)
    }

    /// Request the device name.
    pub async fn device_name(&mut self) -> SessionResult<String> {
        let reply = self.send_and_await(CMD_GET_DEVICE_NAME, None).await?;
        Ok(decode_device_name(&reply))
    }

    /// Switch the device into live preview.
    pub async fn enter_preview(&mut self) -> SessionResult<()> {
        let reply = self.send_and_await(CMD_CUSTOM_PREVIEW, None).await?;
        self.expect_ack(&reply)
    }

    /// Show one preview frame, one color per LED.
    pub async fn preview(&mut self, colors: &[Rgb]) -> SessionResult<()> {
        self.preview_frame(&PreviewFrame::from_colors(colors)).await
    }

    /// Show one preview frame and wait for its acknowledgment.
    ///
    /// The device has no buffering, so frames must not be pipelined.
    pub async fn preview_frame(&mut self, frame: &PreviewFrame) -> SessionResult<()> {
        self.ensure_ready()?;
        let wire = frame.encode();
        let reply = self.round_trip(&wire, CMD_CUSTOM_PREVIEW).await;
        let reply = self.settle(reply, true)?;
        self.expect_ack(&reply)
    }

    /// Replay [`SELF_TEST_SEQUENCE`] and return the decoded status.
    pub async fn self_test(&mut self) -> SessionResult<StatusReport> {
        let mut report = None;
        for step in SELF_TEST_SEQUENCE {
            if step.opcode == CMD_CHECK_DEVICE {
                self.check_device(Challenge::from_le_bytes(step.payload)).await?;
            } else {
                let payload = Some(step.payload.as_slice());
                let reply = self.send_and_await(step.opcode, payload).await?;
                report = Some(self.decode_status(&reply)?);
            }
        }
        info!("self test sequence completed");
        report.ok_or_else(|| SessionError::Transport("self test sequence has no sync step".into()))
    }

    /// Close the transport. The session cannot be used afterwards.
    pub async fn close(&mut self) -> SessionResult<()> {
        self.state = SessionState::Closed;
        self.transport.close().await
    }

    fn ensure_ready(&self) -> SessionResult<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Desynchronized => Err(SessionError::Desynchronized),
            SessionState::Closed => Err(SessionError::NotConnected),
        }
    }

    /// Pass `result` through, marking the session desynchronized if the
    /// error means alignment is lost. Transport failures always count; with
    /// `awaiting`, a timeout counts too.
    fn settle<R>(&mut self, result: SessionResult<R>, awaiting: bool) -> SessionResult<R> {
        if let Err(e) = &result {
            let lost = e.is_fatal() || (awaiting && matches!(e, SessionError::Timeout));
            if lost && self.state == SessionState::Ready {
                error!(error = %e, "session desynchronized");
                ::metrics::counter!(metric_names::DESYNCS).increment(1);
                self.state = SessionState::Desynchronized;
            }
        }
        result
    }

    fn decode_status(&mut self, reply: &[u8]) -> SessionResult<StatusReport> {
        let report = StatusReport::decode(reply).map_err(SessionError::from);
        let report = self.settle(report, true)?;
        if !report.warnings.is_empty() {
            ::metrics::counter!(metric_names::DECODE_WARNINGS)
                .increment(report.warnings.len() as u64);
        }
        Ok(report)
    }

    fn expect_ack(&mut self, reply: &[u8]) -> SessionResult<()> {
        if reply == [PREVIEW_ACK] {
            return Ok(());
        }
        let err = ProtocolError::UnexpectedReply {
            expected: format!("preview ack {:02x}", PREVIEW_ACK),
            actual: reply.to_vec(),
        };
        self.settle(Err(err.into()), true)
    }

    async fn round_trip(&mut self, frame: &Frame, opcode: u8) -> SessionResult<Vec<u8>> {
        self.write_frame(frame).await?;
        self.read_reply(opcode).await
    }

    async fn write_frame(&mut self, frame: &Frame) -> SessionResult<()> {
        debug!(
            opcode = %frame.opcode().map(CommandCatalog::name).unwrap_or_default(),
            tx = %frame.to_hex(),
            "send"
        );
        self.transport.send(frame.as_bytes()).await?;
        ::metrics::counter!(metric_names::FRAMES_SENT).increment(1);
        Ok(())
    }

    async fn read_reply(&mut self, opcode: u8) -> SessionResult<Vec<u8>> {
        let reply = match CommandCatalog::reply_len(opcode) {
            Some(len) => self.read_exact(len).await?,
            None => self.read_once().await?,
        };
        debug!(rx = %hex::encode(&reply), "receive");
        ::metrics::counter!(metric_names::REPLIES_RECEIVED).increment(1);
        Ok(reply)
    }

    async fn read_exact(&mut self, len: usize) -> SessionResult<Vec<u8>> {
        let deadline = Instant::now() + self.config.read_timeout;
        let mut reply = vec![0u8; len];
        let mut filled = 0;

        while filled < len {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.transport.receive(&mut reply[filled..], remaining).await {
                Ok(0) => return Err(SessionError::ConnectionLost),
                Ok(n) => filled += n,
                Err(SessionError::Timeout) if filled > 0 => {
                    return Err(ProtocolError::FrameTooShort {
                        expected: len,
                        actual: filled,
                    }
                    .into());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(reply)
    }

    async fn read_once(&mut self) -> SessionResult<Vec<u8>> {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = self
            .transport
            .receive(&mut buf, self.config.read_timeout)
            .await?;
        if n == 0 {
            return Err(SessionError::ConnectionLost);
        }
        buf.truncate(n);
        Ok(buf)
    }
}
