//! # Voltage MC - MELSEC Communication Protocol Library
//!
//! **Author:** Evan Liu <liuyifanz.1996@gmail.com>
//! **License:** MIT
//!
//! An async MC protocol (MELSEC communication) client in pure Rust for
//! talking to Mitsubishi PLCs over TCP, designed for industrial automation
//! and data acquisition applications.
//!
//! ## Features
//!
//! - **Three frame dialects**: A-compatible 1E and QnA-compatible 3E/4E binary frames
//! - **Typed register access**: i16/u16/i32/u32/f32/f64 over consecutive word devices
//! - **Bit signals**: packed bit read/write on word devices, 16 bits per register
//! - **Struct marshalling**: declarative fixed-layout records with packed booleans,
//!   fixed-length ASCII strings and nested records
//! - **Robust exchanges**: bounded retry with reconnect, malformed-response
//!   detection and cancellation support
//! - **Built-in monitoring**: transport statistics and structured tracing
//!
//! ## Supported Operations
//!
//! | Command | Operation | Frames |
//! |---------|-----------|--------|
//! | 0x0401 | Device-block batch read (word units) | 1E / 3E / 4E |
//! | 0x1401 | Device-block batch write (word units) | 1E / 3E / 4E |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voltage_mc::{DeviceType, FrameVariant, McConfig, McResult, McTcpClient};
//!
//! #[tokio::main]
//! async fn main() -> McResult<()> {
//!     // Connect to the PLC
//!     let config = McConfig::new("192.168.3.39", 6000, FrameVariant::Mc3E);
//!     let mut client = McTcpClient::new(config)?;
//!     client.connect().await?;
//!
//!     // Read data registers D100..D110
//!     let values = client.read_words::<i16>(DeviceType::D, 100, 10).await?;
//!     println!("Read registers: {:?}", values);
//!
//!     // Set bit signals M0..M3
//!     client.write_bits(DeviceType::M, 0, &[true, false, true]).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// MC protocol constants for the binary frame dialects
pub mod constants;

/// PLC device (soft element) addressing
pub mod device;

/// Frame construction and response parsing
pub mod frame;

/// Device-block command construction
pub mod command;

/// Network transport layer for TCP communication
pub mod transport;

/// MC client implementations
pub mod client;

/// Client configuration
pub mod config;

// ============================================================================
// Data marshalling modules
// ============================================================================

/// Typed values spanning one or more registers
pub mod value;

/// Fixed-layout struct marshalling
pub mod schema;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use voltage_mc::tokio) ===
pub use tokio;

// === Core client API ===
pub use client::{McClient, McTcpClient};

// === Error handling ===
pub use error::{McError, McResult};

// === Core types ===
pub use command::{Command, CommandBuilder};
pub use config::{ExecutionMode, McConfig, RegisterBlock};
pub use device::DeviceType;
pub use frame::{FrameVariant, Response, SessionParams};
pub use transport::{McTransport, TcpTransport, TransportStats};

// === Data marshalling ===
pub use schema::{Field, FieldKind, FieldValue, StructSchema};
pub use value::WordElement;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
