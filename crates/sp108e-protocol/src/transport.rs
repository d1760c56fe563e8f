//! Byte-level transport to a controller.
//!
//! The [`Session`](crate::Session) never opens sockets itself. It is handed
//! something that can write bytes and read bytes with a deadline; the TCP
//! implementation lives in the CLI crate and tests use
//! [`MockTransport`](crate::mock::MockTransport).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SessionResult;

/// Asynchronous byte-level transport to a controller.
#[async_trait]
pub trait Transport: Send {
    /// Write all of `data`.
    async fn send(&mut self, data: &[u8]) -> SessionResult<()>;

    /// Read whatever is available into `buf`, waiting at most `timeout`.
    ///
    /// Returns the number of bytes read, or
    /// [`SessionError::Timeout`](crate::SessionError::Timeout) if nothing
    /// arrived before the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> SessionResult<usize>;

    /// Close the connection. Later calls fail with `NotConnected`.
    async fn close(&mut self) -> SessionResult<()>;

    /// Whether the connection is open.
    fn is_connected(&self) -> bool;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&mut self, data: &[u8]) -> SessionResult<()> {
        (**self).send(data).await
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> SessionResult<usize> {
        (**self).receive(buf, timeout).await
    }

    async fn close(&mut self) -> SessionResult<()> {
        (**self).close().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
