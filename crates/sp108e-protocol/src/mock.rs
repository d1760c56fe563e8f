//! Scripted in-memory transport.
//!
//! [`MockTransport`] is loaded with request/reply pairs and checks that the
//! session writes exactly the expected bytes in the expected order. A reply
//! can be split into chunks to imitate TCP segmentation, or left empty to
//! imitate a command the device does not answer.
//!
//! # Example
//!
//! ```ignore
//! use sp108e_protocol::mock::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // sync -> 17-byte status reply
//! mock.expect(
//!     &[0x38, 0x00, 0x00, 0x00, 0x10, 0x83],
//!     &[0x38, 0x01, 0xFC, 0x01, 0x0A, 0x02, 0x00, 0x3C, 0x00, 0x01,
//!       0xB3, 0x00, 0xFF, 0x03, 0x00, 0x00, 0x83],
//! );
//! // speed -> no reply
//! mock.expect_silence(&[0x38, 0x80, 0x00, 0x00, 0x03, 0x83]);
//! ```

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{SessionError, SessionResult};
use crate::transport::Transport;

#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    chunks: VecDeque<Vec<u8>>,
    /// Fail the write with this error kind instead of accepting it.
    send_error: Option<io::ErrorKind>,
}

/// A [`Transport`] that replays scripted replies.
#[derive(Debug)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    /// Reply chunks still to be handed out for the last request.
    pending: VecDeque<Vec<u8>>,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a connected mock with no expectations.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending: VecDeque::new(),
            connected: true,
            sent_log: Vec::new(),
        }
    }

    /// Expect `request` and answer it with `reply` in one read.
    pub fn expect(&mut self, request: &[u8], reply: &[u8]) {
        self.expect_chunked(request, &[reply]);
    }

    /// Expect `request` and answer it with `chunks`, one per read.
    pub fn expect_chunked(&mut self, request: &[u8], chunks: &[&[u8]]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            chunks: chunks
                .iter()
                .filter(|c| !c.is_empty())
                .map(|c| c.to_vec())
                .collect(),
            send_error: None,
        });
    }

    /// Expect `request` and never answer it; reads time out.
    pub fn expect_silence(&mut self, request: &[u8]) {
        self.expect_chunked(request, &[]);
    }

    /// Expect `request` and fail its write with an I/O error of `kind`.
    pub fn expect_send_failure(&mut self, request: &[u8], kind: io::ErrorKind) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            chunks: VecDeque::new(),
            send_error: Some(kind),
        });
    }

    /// Every write, in order.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Force the connected state.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> SessionResult<()> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        let expectation = self.expectations.pop_front().ok_or_else(|| {
            SessionError::Transport("no more expectations in mock transport".into())
        })?;
        if data != expectation.request.as_slice() {
            return Err(SessionError::Transport(format!(
                "unexpected send data: expected {}, got {}",
                hex::encode(&expectation.request),
                hex::encode(data)
            )));
        }
        if let Some(kind) = expectation.send_error {
            return Err(io::Error::new(kind, "scripted send failure").into());
        }
        // Unread bytes from the previous reply stay ahead of the new one,
        // as they would on a socket.
        self.pending.extend(expectation.chunks);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> SessionResult<usize> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }

        let chunk = self.pending.pop_front().ok_or(SessionError::Timeout)?;
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.pending.push_front(chunk[n..].to_vec());
        }
        Ok(n)
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
