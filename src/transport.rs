//! Transport layer for MC communication
//!
//! [`McTransport`] is the seam between the protocol client and the byte
//! pipe: one fully-framed request in, one raw response out. The production
//! implementation is [`TcpTransport`]; tests substitute mock transports.
//!
//! The MC reply stream carries no transport-level framing beyond the
//! response itself, so the receive loop reads fixed-size chunks and treats
//! the first short read as end-of-response. Response validation happens a
//! layer up, against the frame dialect's declared lengths.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::McConfig;
use crate::constants::READ_CHUNK_SIZE;
use crate::error::{McError, McResult};

/// Transport statistics for monitoring communication health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Requests written to the wire
    pub requests_sent: u64,
    /// Responses received (any length)
    pub responses_received: u64,
    /// Transport-level failures (timeouts, resets, write errors)
    pub errors: u64,
    /// Total bytes written
    pub bytes_sent: u64,
    /// Total bytes read
    pub bytes_received: u64,
}

/// Byte-pipe abstraction the protocol client is generic over.
///
/// # Implemented By
///
/// - [`TcpTransport`] - production TCP transport
/// - mock transports in unit tests
pub trait McTransport: Send {
    /// Send one framed request and collect the raw response bytes.
    ///
    /// Cancelling `cancel` aborts the exchange with [`McError::Cancelled`].
    fn execute(
        &mut self,
        request: &[u8],
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = McResult<Vec<u8>>> + Send;

    /// Establish the connection. Idempotent when already connected.
    fn connect(&mut self) -> impl std::future::Future<Output = McResult<()>> + Send;

    /// Close the connection. Idempotent when already closed.
    fn disconnect(&mut self) -> impl std::future::Future<Output = McResult<()>> + Send;

    /// Whether the transport currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// Communication statistics since creation.
    fn get_stats(&self) -> TransportStats;
}

/// TCP transport with timeouts, keep-alive and statistics.
pub struct TcpTransport {
    endpoint: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
    stream: Option<TcpStream>,
    stats: TransportStats,
}

impl TcpTransport {
    /// Create a disconnected transport for `endpoint` (`host:port`).
    pub fn new<S: Into<String>>(
        endpoint: S,
        connect_timeout: Duration,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            read_timeout,
            write_timeout,
            stream: None,
            stats: TransportStats::default(),
        }
    }

    /// Create a disconnected transport from a client configuration.
    pub fn from_config(config: &McConfig) -> Self {
        Self::new(
            config.endpoint(),
            config.execution_timeout(),
            config.read_timeout(),
            config.write_timeout(),
        )
    }

    /// Target endpoint (`host:port`).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_stream(&self) -> McResult<TcpStream> {
        let addr = lookup_host(&self.endpoint)
            .await
            .map_err(|e| {
                McError::connection(format!("Cannot resolve {}: {}", self.endpoint, e))
            })?
            .next()
            .ok_or_else(|| {
                McError::connection(format!("No address found for {}", self.endpoint))
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_keepalive(true)?;
        socket.set_nodelay(true)?;

        let stream = timeout(self.connect_timeout, socket.connect(addr))
            .await
            .map_err(|_| {
                McError::connection(format!(
                    "Connect to {} timed out after {:?}",
                    self.endpoint, self.connect_timeout
                ))
            })??;

        debug!(endpoint = %self.endpoint, "TCP connection established");
        Ok(stream)
    }

    /// One request/response exchange on the open stream.
    async fn exchange(
        stream: &mut TcpStream,
        request: &[u8],
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> McResult<Vec<u8>> {
        timeout(write_timeout, async {
            stream.write_all(request).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| McError::write(format!("Write timed out after {:?}", write_timeout)))??;

        // Accumulate fixed-size chunks; the first short read marks the end
        // of the response.
        let mut response = BytesMut::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = timeout(read_timeout, stream.read(&mut chunk))
                .await
                .map_err(|_| {
                    McError::read(format!("Read timed out after {:?}", read_timeout))
                })??;

            // A zero-byte read means the peer closed the connection.
            if n == 0 {
                return Err(McError::connection("Connection closed by peer"));
            }
            response.extend_from_slice(&chunk[..n]);
            if n < READ_CHUNK_SIZE {
                break;
            }
        }

        Ok(response.to_vec())
    }
}

impl McTransport for TcpTransport {
    async fn execute(&mut self, request: &[u8], cancel: &CancellationToken) -> McResult<Vec<u8>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| McError::connection("Transport is not connected"))?;

        self.stats.requests_sent += 1;
        self.stats.bytes_sent += request.len() as u64;
        trace!(len = request.len(), "Sending request frame");

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(McError::Cancelled),
            r = Self::exchange(stream, request, self.read_timeout, self.write_timeout) => r,
        };

        match result {
            Ok(response) => {
                self.stats.responses_received += 1;
                self.stats.bytes_received += response.len() as u64;
                trace!(len = response.len(), "Received response frame");
                Ok(response)
            }
            Err(McError::Cancelled) => Err(McError::Cancelled),
            Err(e) => {
                // A failed exchange leaves the stream in an unknown state.
                self.stats.errors += 1;
                self.stream = None;
                warn!(endpoint = %self.endpoint, error = %e, "Exchange failed, connection dropped");
                Err(e)
            }
        }
    }

    async fn connect(&mut self) -> McResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.stream = Some(self.open_stream().await?);
        Ok(())
    }

    async fn disconnect(&mut self) -> McResult<()> {
        if let Some(mut stream) = self.stream.take() {
            // Best effort; the peer may already be gone.
            let _ = stream.shutdown().await;
            debug!(endpoint = %self.endpoint, "TCP connection closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn get_stats(&self) -> TransportStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameVariant;

    #[test]
    fn test_from_config_endpoint() {
        let config = McConfig::new("192.168.3.39", 6000, FrameVariant::Mc3E);
        let transport = TcpTransport::from_config(&config);
        assert_eq!(transport.endpoint(), "192.168.3.39:6000");
        assert!(!transport.is_connected());
        assert_eq!(transport.get_stats(), TransportStats::default());
    }

    #[tokio::test]
    async fn test_execute_when_disconnected_fails() {
        let mut transport = TcpTransport::new(
            "127.0.0.1:1",
            Duration::from_millis(100),
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        let err = transport
            .execute(&[0x50, 0x00], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, McError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut transport = TcpTransport::new(
            "127.0.0.1:1",
            Duration::from_millis(100),
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        assert!(transport.disconnect().await.is_ok());
        assert!(transport.disconnect().await.is_ok());
    }

    #[tokio::test]
    async fn test_roundtrip_against_local_listener() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Echo server: read one request, reply with a fixed short response.
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0);
            socket.write_all(&[0xD0, 0x00, 0x01, 0x02]).await.unwrap();
            socket.flush().await.unwrap();
        });

        let mut transport = TcpTransport::new(
            addr.to_string(),
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        let response = transport
            .execute(&[0x50, 0x00, 0x01], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, vec![0xD0, 0x00, 0x01, 0x02]);

        let stats = transport.get_stats();
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.responses_received, 1);
        assert_eq!(stats.bytes_sent, 3);
        assert_eq!(stats.bytes_received, 4);

        transport.disconnect().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_exchange_reports_cancelled() {
        use tokio::net::TcpListener;

        // A listener that accepts but never replies keeps the read pending
        // until the token fires.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut transport = TcpTransport::new(
            addr.to_string(),
            Duration::from_secs(1),
            Duration::from_secs(10),
            Duration::from_secs(1),
        );
        transport.connect().await.unwrap();

        let cancel = CancellationToken::new();
        let child = cancel.child_token();
        cancel.cancel();

        let err = transport.execute(&[0x00], &child).await.unwrap_err();
        assert!(err.is_cancelled());
        server.abort();
    }
}
