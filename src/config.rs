//! Client configuration
//!
//! Connection endpoint, frame variant, signal-exchange register map and
//! timing knobs for one PLC session. The struct round-trips through serde so
//! deployments can keep per-device settings in JSON/YAML files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_RETRIES;
use crate::device::DeviceType;
use crate::error::{McError, McResult};
use crate::frame::{FrameVariant, SessionParams};

/// How queued task operations are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// One task at a time, in submission order
    #[default]
    Sequential,
    /// Tasks may overlap
    Concurrent,
}

/// One direction of the bit/word signal-exchange register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBlock {
    /// Device class the block lives in
    pub device: DeviceType,
    /// First address of the block
    pub start_address: u32,
}

impl RegisterBlock {
    /// Create a block descriptor.
    pub fn new(device: DeviceType, start_address: u32) -> Self {
        Self {
            device,
            start_address,
        }
    }
}

/// Full client configuration for one PLC session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McConfig {
    /// PLC IP address or host name
    pub ip: String,
    /// PLC TCP port
    pub port: u16,
    /// Frame dialect spoken by the PLC
    pub frame: FrameVariant,
    /// Session routing fields carried in every 3E/4E request
    pub session: SessionParams,

    /// Heartbeat send interval in seconds (0 disables the heartbeat)
    pub heartbeat_interval_secs: u16,
    /// Sleep between polling-loop iterations, milliseconds
    pub run_sleep_time_ms: u16,

    /// Outgoing bit-signal block
    pub bit_send: RegisterBlock,
    /// Incoming bit-signal block
    pub bit_receive: RegisterBlock,
    /// Bit-signal block length in bits
    pub bit_address_range: u16,

    /// Outgoing word-signal block
    pub word_send: RegisterBlock,
    /// Incoming word-signal block
    pub word_receive: RegisterBlock,
    /// Word-signal block length in registers
    pub word_address_range: u16,

    /// Read timeout, milliseconds
    pub read_timeout_ms: u64,
    /// Write timeout, milliseconds
    pub write_timeout_ms: u64,
    /// Whole-task execution timeout, milliseconds
    pub execution_timeout_ms: u64,

    /// Task-execution handshake flag address
    pub task_execution_address: u32,
    /// Task-completed handshake flag address
    pub task_completed_address: u32,
    /// Task data read block start address
    pub read_data_address: u32,
    /// Task data write block start address
    pub write_data_address: u32,

    /// Upper bound on protocol retries before an operation fails
    pub max_retries: u32,
    /// Delay between retries, milliseconds (0 retries immediately)
    pub retry_delay_ms: u64,
    /// Task dispatch mode
    pub execution_mode: ExecutionMode,
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 5007,
            frame: FrameVariant::Mc3E,
            session: SessionParams::default(),
            heartbeat_interval_secs: 5,
            run_sleep_time_ms: 50,
            bit_send: RegisterBlock::new(DeviceType::M, 0),
            bit_receive: RegisterBlock::new(DeviceType::M, 1000),
            bit_address_range: 100,
            word_send: RegisterBlock::new(DeviceType::D, 0),
            word_receive: RegisterBlock::new(DeviceType::D, 1000),
            word_address_range: 100,
            read_timeout_ms: 3000,
            write_timeout_ms: 3000,
            execution_timeout_ms: 10_000,
            task_execution_address: 0,
            task_completed_address: 0,
            read_data_address: 0,
            write_data_address: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: 0,
            execution_mode: ExecutionMode::Sequential,
        }
    }
}

impl McConfig {
    /// Minimal configuration for an endpoint, all other fields defaulted.
    pub fn new<S: Into<String>>(ip: S, port: u16, frame: FrameVariant) -> Self {
        Self {
            ip: ip.into(),
            port,
            frame,
            ..Self::default()
        }
    }

    /// `ip:port` endpoint string for the TCP connector.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Read timeout as a [`Duration`].
    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write timeout as a [`Duration`].
    #[inline]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Whole-task execution timeout as a [`Duration`].
    #[inline]
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    /// Delay between protocol retries as a [`Duration`].
    #[inline]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Heartbeat interval, or `None` when disabled.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0)
            .then(|| Duration::from_secs(u64::from(self.heartbeat_interval_secs)))
    }

    /// Reject configurations that cannot produce a working session.
    pub fn validate(&self) -> McResult<()> {
        if self.ip.is_empty() {
            return Err(McError::configuration("IP address must not be empty"));
        }
        if self.port == 0 {
            return Err(McError::configuration("Port must not be 0"));
        }
        if self.max_retries == 0 {
            return Err(McError::configuration("max_retries must be at least 1"));
        }
        if self.bit_address_range == 0 || self.word_address_range == 0 {
            return Err(McError::configuration(
                "Signal address ranges must be at least 1",
            ));
        }
        Ok(())
    }
}
