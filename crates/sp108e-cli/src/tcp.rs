//! TCP transport to a controller.
//!
//! The controller listens on a plain TCP socket (port 8189) on its own
//! access point or on the LAN it was configured to join.

use std::time::Duration;

use async_trait::async_trait;
use sp108e_protocol::{SessionError, SessionResult, Transport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`Transport`] over a tokio [`TcpStream`].
#[derive(Debug)]
pub struct TcpTransport {
    /// `None` after `close()`.
    stream: Option<TcpStream>,
    /// Peer address for logs.
    addr: String,
}

impl TcpTransport {
    /// Connect using the default timeout.
    pub async fn connect(addr: &str) -> SessionResult<Self> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to `host:port`, giving up after `timeout`.
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> SessionResult<Self> {
        tracing::debug!(
            addr = %addr,
            timeout_ms = timeout.as_millis(),
            "Connecting to controller"
        );

        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                tracing::error!(addr = %addr, "TCP connection timed out");
                SessionError::Timeout
            })?
            .map_err(|e| {
                tracing::error!(addr = %addr, error = %e, "TCP connection failed");
                map_connect_error(e, addr)
            })?;

        // Every frame is six bytes and waits on a reply.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        tracing::info!(addr = %addr, "Connected to controller");

        Ok(Self {
            stream: Some(stream),
            addr: addr.to_string(),
        })
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        Self {
            stream: Some(stream),
            addr,
        }
    }

    /// Peer address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> SessionResult<()> {
        let stream = self.stream.as_mut().ok_or(SessionError::NotConnected)?;

        tracing::trace!(addr = %self.addr, data = %hex::encode(data), "> tcp");

        stream.write_all(data).await.map_err(map_io_error)?;
        stream.flush().await.map_err(map_io_error)?;
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> SessionResult<usize> {
        let stream = self.stream.as_mut().ok_or(SessionError::NotConnected)?;

        match tokio::time::timeout(timeout, stream.read(buf)).await {
            Ok(Ok(0)) => {
                tracing::warn!(addr = %self.addr, "Controller closed connection");
                Err(SessionError::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(addr = %self.addr, data = %hex::encode(&buf[..n]), "< tcp");
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(addr = %self.addr, error = %e, "Failed to receive data");
                Err(map_io_error(e))
            }
            Err(_) => {
                tracing::trace!(
                    addr = %self.addr,
                    timeout_ms = timeout.as_millis(),
                    "Timeout waiting for data"
                );
                Err(SessionError::Timeout)
            }
        }
    }

    async fn close(&mut self) -> SessionResult<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::warn!(addr = %self.addr, error = %e, "Failed to shut down TCP stream");
            }
            tracing::debug!(addr = %self.addr, "Connection closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

fn map_connect_error(e: std::io::Error, addr: &str) -> SessionError {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            SessionError::Transport(format!("connection refused: {}", addr))
        }
        _ => SessionError::Io(e),
    }
}

fn map_io_error(e: std::io::Error) -> SessionError {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted => SessionError::ConnectionLost,
        _ => SessionError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_send_receive() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 6];
            stream.read_exact(&mut buf).await.unwrap();
            assert_eq!(buf, [0x38, 0x00, 0x00, 0x00, 0x10, 0x83]);
            stream.write_all(&[0x31]).await.unwrap();
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        assert!(transport.is_connected());
        transport
            .send(&[0x38, 0x00, 0x00, 0x00, 0x10, 0x83])
            .await
            .unwrap();
        let mut buf = [0u8; 16];
        let n = transport
            .receive(&mut buf, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[0x31]);

        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_timeout() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        let mut buf = [0u8; 16];
        let result = transport.receive(&mut buf, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(SessionError::Timeout)));

        server.abort();
    }

    #[tokio::test]
    async fn test_peer_close_is_connection_lost() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        server.await.unwrap();
        let mut buf = [0u8; 16];
        let result = transport.receive(&mut buf, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(SessionError::ConnectionLost)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, addr) = listener().await;
        drop(listener);

        let err = TcpTransport::connect(&addr).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(msg) if msg.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_send() {
        let (listener, addr) = listener().await;
        let _server = tokio::spawn(async move { listener.accept().await });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        transport.close().await.unwrap();
        assert!(matches!(
            transport.send(&[0x00]).await,
            Err(SessionError::NotConnected)
        ));
    }
}
