//! High-level MC protocol client
//!
//! [`McClient`] implements the application layer — command construction,
//! retry, response validation and value conversion — over any
//! [`McTransport`]. [`McTcpClient`] pairs it with the production TCP
//! transport.
//!
//! # Retry semantics
//!
//! Every device exchange runs through a retry loop that performs exactly
//! `max_retries` attempts. An attempt fails when the transport errors, when
//! the response is shorter than the dialect's fixed header, or when a
//! success reply's declared payload length disagrees with what was actually
//! received. Error replies from the PLC (non-zero completion code) are
//! terminal: they are a PLC-side fault, not a communication fault, and
//! retrying them would not help.
//!
//! Cancellation is never retried and never rewrapped; it surfaces as
//! [`McError::Cancelled`] from any depth.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voltage_mc::{FrameVariant, McConfig, McResult, McTcpClient};
//!
//! #[tokio::main]
//! async fn main() -> McResult<()> {
//!     let config = McConfig::new("192.168.3.39", 6000, FrameVariant::Mc3E);
//!     let mut client = McTcpClient::new(config)?;
//!     client.connect().await?;
//!
//!     // Read 4 data registers starting at D100
//!     let words = client.read_words::<i16>("D".parse()?, 100, 4).await?;
//!     println!("D100..D104 = {:?}", words);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandBuilder};
use crate::config::McConfig;
use crate::device::DeviceType;
use crate::error::{McError, McResult};
use crate::frame::{is_incorrect_response, parse_response, Response};
use crate::schema::{FieldValue, StructSchema};
use crate::transport::{McTransport, TcpTransport, TransportStats};
use crate::value::{decode_elements, encode_elements, WordElement};

/// Generic MC client over any transport.
///
/// Application-layer logic lives here once; transport-specific concerns
/// (sockets, timeouts, keep-alive) live in the transport implementation.
pub struct McClient<T: McTransport> {
    config: McConfig,
    builder: CommandBuilder,
    transport: T,
    cancel: CancellationToken,
}

impl<T: McTransport> McClient<T> {
    /// Create a client over an existing transport.
    ///
    /// Fails fast on an invalid configuration.
    pub fn new(config: McConfig, transport: T) -> McResult<Self> {
        config.validate()?;
        let builder = CommandBuilder::with_session(config.frame, config.session);
        Ok(Self {
            config,
            builder,
            transport,
            cancel: CancellationToken::new(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &McConfig {
        &self.config
    }

    /// Reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Cancellation token aborting in-flight operations when triggered.
    ///
    /// Clone it into supervisory tasks; cancelling makes every pending and
    /// future exchange return [`McError::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ========================================================================
    // Connection management
    // ========================================================================

    /// Establish the transport connection.
    ///
    /// Cancellation aborts the attempt and drops the half-open socket.
    pub async fn connect(&mut self) -> McResult<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => return Err(McError::Cancelled),
            r = self.transport.connect() => r?,
        }
        info!(endpoint = %self.config.endpoint(), frame = %self.config.frame, "PLC connected");
        Ok(())
    }

    /// Close the transport connection.
    pub async fn close(&mut self) -> McResult<()> {
        self.transport.disconnect().await
    }

    /// Whether the transport currently holds a live connection.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Transport statistics.
    pub fn get_stats(&self) -> TransportStats {
        self.transport.get_stats()
    }

    /// Drop the current connection and establish a fresh one.
    pub async fn try_reconnect(&mut self) -> McResult<()> {
        self.transport.disconnect().await?;
        self.transport.connect().await?;
        debug!(endpoint = %self.config.endpoint(), "Reconnected");
        Ok(())
    }

    /// Reconnect with up to `max_retries` attempts, waiting the configured
    /// retry delay between them.
    pub async fn try_reconnect_with_retry(&mut self) -> McResult<()> {
        let mut last_err = McError::connection("Reconnect never attempted");
        for attempt in 1..=self.config.max_retries {
            if self.cancel.is_cancelled() {
                return Err(McError::Cancelled);
            }
            match self.try_reconnect().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, error = %e, "Reconnect attempt failed");
                    last_err = e;
                }
            }
            if attempt < self.config.max_retries && !self.config.retry_delay().is_zero() {
                sleep(self.config.retry_delay()).await;
            }
        }
        Err(last_err)
    }

    // ========================================================================
    // Core exchange
    // ========================================================================

    /// Run one command through the retry loop and parse the reply.
    ///
    /// Performs exactly `max_retries` attempts; a response passes when it
    /// reaches the dialect's minimum length and its declared payload length
    /// is consistent. A non-zero PLC completion code is terminal.
    async fn execute_with_retry(&mut self, command: &Command) -> McResult<Response> {
        let min_len = command.min_response_len;

        for attempt in 1..=self.config.max_retries {
            let raw = match self.transport.execute(&command.bytes, &self.cancel).await {
                Ok(raw) => raw,
                Err(McError::Cancelled) => return Err(McError::Cancelled),
                Err(e) => {
                    warn!(attempt, error = %e, "Exchange failed");
                    // Communication faults drop the connection; restore it
                    // before the next attempt.
                    if attempt < self.config.max_retries {
                        if let Err(e) = self.try_reconnect().await {
                            warn!(attempt, error = %e, "Reconnect failed");
                        }
                        self.retry_pause().await?;
                    }
                    continue;
                }
            };

            if raw.len() < min_len || is_incorrect_response(self.config.frame, &raw, min_len) {
                warn!(
                    attempt,
                    len = raw.len(),
                    min_len,
                    "Malformed response, retrying"
                );
                if attempt < self.config.max_retries {
                    self.retry_pause().await?;
                }
                continue;
            }

            let response = parse_response(self.config.frame, &raw)?;
            if !response.is_ok() {
                return Err(McError::read(format!(
                    "PLC returned completion code 0x{:04X}",
                    response.result_code
                )));
            }
            return Ok(response);
        }

        Err(McError::read(format!(
            "No valid response after {} attempts",
            self.config.max_retries
        )))
    }

    async fn retry_pause(&self) -> McResult<()> {
        if self.cancel.is_cancelled() {
            return Err(McError::Cancelled);
        }
        if !self.config.retry_delay().is_zero() {
            sleep(self.config.retry_delay()).await;
        }
        Ok(())
    }

    /// Batch-read `word_count` registers and return the raw payload.
    pub async fn read_device_block(
        &mut self,
        device: DeviceType,
        address: u32,
        word_count: u16,
    ) -> McResult<Vec<u8>> {
        let command = self.builder.build_read(device, address, word_count);
        let response = self.execute_with_retry(&command).await?;

        let expected = usize::from(word_count) * 2;
        if response.payload.len() < expected {
            return Err(McError::read(format!(
                "Read {}{} x{}: payload is {} bytes, expected {}",
                device,
                address,
                word_count,
                response.payload.len(),
                expected
            )));
        }
        Ok(response.payload)
    }

    /// Batch-write a raw payload spanning `word_count` registers.
    pub async fn write_device_block(
        &mut self,
        device: DeviceType,
        address: u32,
        word_count: u16,
        payload: &[u8],
    ) -> McResult<()> {
        let command = self
            .builder
            .build_write(device, address, word_count, payload);
        self.execute_with_retry(&command).await?;
        Ok(())
    }

    // ========================================================================
    // Typed word access
    // ========================================================================

    /// Read `count` values of `V` from consecutive registers.
    pub async fn read_words<V: WordElement>(
        &mut self,
        device: DeviceType,
        address: u32,
        count: u16,
    ) -> McResult<Vec<V>> {
        let word_count = count
            .checked_mul(V::register_count())
            .ok_or_else(|| McError::read("Element count overflows the register range"))?;
        let payload = self.read_device_block(device, address, word_count).await?;
        decode_elements(&payload, usize::from(count))
    }

    /// Write values of `V` to consecutive registers.
    pub async fn write_words<V: WordElement>(
        &mut self,
        device: DeviceType,
        address: u32,
        values: &[V],
    ) -> McResult<()> {
        if values.is_empty() {
            return Err(McError::write("Cannot write an empty value slice"));
        }
        let word_count =
            u16::try_from(values.len() * usize::from(V::register_count())).map_err(|_| {
                McError::write("Value slice overflows the register range")
            })?;
        let payload = encode_elements(values);
        self.write_device_block(device, address, word_count, &payload)
            .await
    }

    // ========================================================================
    // Bit access
    // ========================================================================

    /// Read `count` bit signals packed in word devices.
    ///
    /// Bits occupy registers 16 per word; the transfer still runs in word
    /// units, so `count` bits cost `ceil(count / 16)` registers.
    pub async fn read_bits(
        &mut self,
        device: DeviceType,
        address: u32,
        count: u16,
    ) -> McResult<Vec<bool>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let word_count = count.div_ceil(16);
        let payload = self.read_device_block(device, address, word_count).await?;

        let bits = (0..usize::from(count))
            .map(|i| (payload[i / 8] >> (i % 8)) & 1 == 1)
            .collect();
        Ok(bits)
    }

    /// Write bit signals packed in word devices, low bit first.
    pub async fn write_bits(
        &mut self,
        device: DeviceType,
        address: u32,
        bits: &[bool],
    ) -> McResult<()> {
        if bits.is_empty() {
            return Err(McError::write("Cannot write an empty bit slice"));
        }
        let word_count = u16::try_from(bits.len().div_ceil(16))
            .map_err(|_| McError::write("Bit slice overflows the register range"))?;

        let mut payload = vec![0u8; usize::from(word_count) * 2];
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                payload[i / 8] |= 1 << (i % 8);
            }
        }
        self.write_device_block(device, address, word_count, &payload)
            .await
    }

    // ========================================================================
    // Struct access
    // ========================================================================

    /// Read one fixed-layout record from data registers at `address`.
    pub async fn read_struct(
        &mut self,
        schema: &StructSchema,
        address: u32,
    ) -> McResult<Vec<FieldValue>> {
        let size = schema.size_of()?;
        let word_count = u16::try_from(size.div_ceil(2))
            .map_err(|_| McError::read("Record overflows the register range"))?;

        let payload = self
            .read_device_block(DeviceType::D, address, word_count)
            .await?;
        if payload.len() < size {
            return Err(McError::read(format!(
                "Record needs {} bytes, payload is {}",
                size,
                payload.len()
            )));
        }
        schema.decode(&payload)
    }

    /// Write one fixed-layout record to data registers at `address`.
    pub async fn write_struct(
        &mut self,
        schema: &StructSchema,
        values: &[FieldValue],
        address: u32,
    ) -> McResult<()> {
        let mut payload = schema.encode(values)?;
        // Transfers run in word units; odd-sized records pad one zero byte.
        if payload.len() % 2 != 0 {
            payload.push(0);
        }
        let word_count = u16::try_from(payload.len() / 2)
            .map_err(|_| McError::write("Record overflows the register range"))?;

        self.write_device_block(DeviceType::D, address, word_count, &payload)
            .await
    }
}

/// MC client over TCP.
pub struct McTcpClient {
    inner: McClient<TcpTransport>,
}

impl McTcpClient {
    /// Create a disconnected client from a configuration.
    pub fn new(config: McConfig) -> McResult<Self> {
        let transport = TcpTransport::from_config(&config);
        Ok(Self {
            inner: McClient::new(config, transport)?,
        })
    }

    /// Access the generic client.
    pub fn inner(&mut self) -> &mut McClient<TcpTransport> {
        &mut self.inner
    }

    /// Probe reachability of the configured PLC endpoint.
    ///
    /// Opens a throwaway connection and closes it immediately, leaving any
    /// live session untouched.
    pub async fn test_connection(config: &McConfig) -> McResult<()> {
        let mut transport = TcpTransport::from_config(config);
        transport.connect().await?;
        transport.disconnect().await
    }
}

impl std::ops::Deref for McTcpClient {
    type Target = McClient<TcpTransport>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for McTcpClient {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameVariant, SessionParams};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // ========================================================================
    // MockTransport
    // ========================================================================

    /// Mock transport replaying a queue of prepared responses.
    struct MockTransport {
        /// Records all request frames received
        requests: Mutex<Vec<Vec<u8>>>,
        /// Pre-configured responses (FIFO queue)
        responses: Mutex<VecDeque<McResult<Vec<u8>>>>,
        connected: Mutex<bool>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(VecDeque::new()),
                connected: Mutex::new(true),
            }
        }

        fn add_response(&self, response: McResult<Vec<u8>>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn get_requests(&self) -> Vec<Vec<u8>> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl McTransport for MockTransport {
        fn execute(
            &mut self,
            request: &[u8],
            _cancel: &CancellationToken,
        ) -> impl std::future::Future<Output = McResult<Vec<u8>>> + Send {
            self.requests.lock().unwrap().push(request.to_vec());
            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(McError::connection("No response prepared in mock")));
            async move { response }
        }

        async fn connect(&mut self) -> McResult<()> {
            *self.connected.lock().unwrap() = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> McResult<()> {
            *self.connected.lock().unwrap() = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap()
        }

        fn get_stats(&self) -> TransportStats {
            TransportStats::default()
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn test_config(max_retries: u32) -> McConfig {
        let mut config = McConfig::new("127.0.0.1", 5007, FrameVariant::Mc3E);
        config.max_retries = max_retries;
        config.retry_delay_ms = 0;
        config
    }

    /// Build a well-formed 3E success response carrying `payload`.
    fn ok_response_3e(payload: &[u8]) -> Vec<u8> {
        response_3e(0, payload)
    }

    fn response_3e(result_code: u16, payload: &[u8]) -> Vec<u8> {
        let mut raw = vec![0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00];
        raw.extend_from_slice(&((payload.len() + 2) as u16).to_le_bytes());
        raw.extend_from_slice(&result_code.to_le_bytes());
        raw.extend_from_slice(payload);
        raw
    }

    fn client_with(
        config: McConfig,
        responses: Vec<McResult<Vec<u8>>>,
    ) -> McClient<MockTransport> {
        let mock = MockTransport::new();
        for r in responses {
            mock.add_response(r);
        }
        McClient::new(config, mock).unwrap()
    }

    // ========================================================================
    // Tests
    // ========================================================================

    #[tokio::test]
    async fn test_read_words_happy_path() {
        let payload = [0x64, 0x00, 0xFF, 0xFF, 0x02, 0x00, 0x2C, 0x01];
        let mut client = client_with(test_config(3), vec![Ok(ok_response_3e(&payload))]);

        let words = client
            .read_words::<i16>(DeviceType::D, 100, 4)
            .await
            .unwrap();
        assert_eq!(words, vec![100, -1, 2, 300]);
        assert_eq!(client.transport().get_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_read_request_frame_bytes() {
        let mut client = client_with(test_config(3), vec![Ok(ok_response_3e(&[0x00, 0x00]))]);
        client
            .read_words::<i16>(DeviceType::D, 100, 1)
            .await
            .unwrap();

        let requests = client.transport().get_requests();
        let expected = CommandBuilder::with_session(FrameVariant::Mc3E, SessionParams::default())
            .build_read(DeviceType::D, 100, 1);
        assert_eq!(requests[0], expected.bytes);
    }

    #[tokio::test]
    async fn test_retry_performs_exactly_max_retries() {
        // Every response is one byte short of the 11-byte minimum.
        let max_retries = 4;
        let responses = (0..max_retries)
            .map(|_| Ok(vec![0u8; 10]))
            .collect::<Vec<_>>();
        let mut client = client_with(test_config(max_retries as u32), responses);

        let err = client
            .read_words::<i16>(DeviceType::D, 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, McError::Read { .. }));
        assert_eq!(client.transport().get_requests().len(), max_retries);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_malformed_response() {
        // Truncated success reply first, then a good one.
        let mut truncated = ok_response_3e(&[0x01, 0x00, 0x02, 0x00]);
        truncated.pop();
        let mut client = client_with(
            test_config(3),
            vec![
                Ok(truncated),
                Ok(ok_response_3e(&[0x01, 0x00, 0x02, 0x00])),
            ],
        );

        let words = client
            .read_words::<i16>(DeviceType::D, 0, 2)
            .await
            .unwrap();
        assert_eq!(words, vec![1, 2]);
        assert_eq!(client.transport().get_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_plc_error_code_is_terminal() {
        // An error reply must not be retried.
        let mut client = client_with(test_config(5), vec![Ok(response_3e(0xC056, &[]))]);

        let err = client
            .read_words::<i16>(DeviceType::D, 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, McError::Read { .. }));
        assert!(err.to_string().contains("C056"));
        assert_eq!(client.transport().get_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_without_retry() {
        let mut client = client_with(test_config(5), vec![Err(McError::Cancelled)]);

        let err = client
            .read_words::<i16>(DeviceType::D, 0, 1)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(client.transport().get_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_write_words_builds_write_command() {
        let mut client = client_with(test_config(3), vec![Ok(ok_response_3e(&[]))]);
        client
            .write_words::<i16>(DeviceType::D, 200, &[1, -1])
            .await
            .unwrap();

        let requests = client.transport().get_requests();
        let expected = CommandBuilder::with_session(FrameVariant::Mc3E, SessionParams::default())
            .build_write(DeviceType::D, 200, 2, &[0x01, 0x00, 0xFF, 0xFF]);
        assert_eq!(requests[0], expected.bytes);
    }

    #[tokio::test]
    async fn test_write_empty_slice_fails_without_io() {
        let mut client = client_with(test_config(3), vec![]);
        let err = client
            .write_words::<i16>(DeviceType::D, 0, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, McError::Write { .. }));
        assert!(client.transport().get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_bit_write_then_read_roundtrip() {
        let bits = [true, false, true];
        // The write payload for 3 bits is one word: 0b101, 0x00.
        let mut client = client_with(
            test_config(3),
            vec![
                Ok(ok_response_3e(&[])),
                Ok(ok_response_3e(&[0b0000_0101, 0x00])),
            ],
        );

        client.write_bits(DeviceType::M, 0, &bits).await.unwrap();
        let back = client.read_bits(DeviceType::M, 0, 3).await.unwrap();
        assert_eq!(back, bits);

        let requests = client.transport().get_requests();
        let expected = CommandBuilder::with_session(FrameVariant::Mc3E, SessionParams::default())
            .build_write(DeviceType::M, 0, 1, &[0b0000_0101, 0x00]);
        assert_eq!(requests[0], expected.bytes);
    }

    #[tokio::test]
    async fn test_read_bits_zero_count_is_empty() {
        let mut client = client_with(test_config(3), vec![]);
        assert!(client
            .read_bits(DeviceType::M, 0, 0)
            .await
            .unwrap()
            .is_empty());
        assert!(client.transport().get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_seventeen_bits_cost_two_registers() {
        let bits = vec![true; 17];
        let mut client = client_with(test_config(3), vec![Ok(ok_response_3e(&[]))]);
        client.write_bits(DeviceType::M, 0, &bits).await.unwrap();

        let requests = client.transport().get_requests();
        let expected = CommandBuilder::with_session(FrameVariant::Mc3E, SessionParams::default())
            .build_write(DeviceType::M, 0, 2, &[0xFF, 0xFF, 0x01, 0x00]);
        assert_eq!(requests[0], expected.bytes);
    }

    #[tokio::test]
    async fn test_struct_roundtrip_through_mock() {
        use crate::schema::Field;

        let schema = StructSchema::new(vec![
            Field::bool("running"),
            Field::i16("speed"),
            Field::string("lot", 4),
        ]);
        let values = vec![
            FieldValue::Bool(true),
            FieldValue::I16(750),
            FieldValue::Str("AB".to_string()),
        ];
        let encoded = schema.encode(&values).unwrap();
        assert_eq!(encoded.len(), 8);

        let mut client = client_with(
            test_config(3),
            vec![Ok(ok_response_3e(&[])), Ok(ok_response_3e(&encoded))],
        );

        client.write_struct(&schema, &values, 500).await.unwrap();
        let back = client.read_struct(&schema, 500).await.unwrap();
        assert_eq!(back, values);

        // 8 bytes is 4 registers on both directions.
        let requests = client.transport().get_requests();
        let expected = CommandBuilder::with_session(FrameVariant::Mc3E, SessionParams::default())
            .build_write(DeviceType::D, 500, 4, &encoded);
        assert_eq!(requests[0], expected.bytes);
    }

    #[tokio::test]
    async fn test_short_payload_is_read_error() {
        // Success reply with fewer bytes than the requested words.
        let mut client = client_with(test_config(1), vec![Ok(ok_response_3e(&[0x01, 0x00]))]);
        let err = client
            .read_words::<i16>(DeviceType::D, 0, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, McError::Read { .. }));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = test_config(3);
        config.port = 0;
        assert!(McClient::new(config, MockTransport::new()).is_err());
    }

    #[tokio::test]
    async fn test_connection_probe() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = McConfig::new(addr.ip().to_string(), addr.port(), FrameVariant::Mc3E);
        McTcpClient::test_connection(&config).await.unwrap();

        // Nothing listens on the discard port.
        let unreachable = McConfig::new("127.0.0.1", 1, FrameVariant::Mc3E);
        assert!(McTcpClient::test_connection(&unreachable).await.is_err());
    }

    #[tokio::test]
    async fn test_connection_lifecycle() {
        let mut client = client_with(test_config(3), vec![]);
        assert!(client.is_connected());
        client.close().await.unwrap();
        assert!(!client.is_connected());
        client.connect().await.unwrap();
        assert!(client.is_connected());
    }
}
