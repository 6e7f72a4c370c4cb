//! Core error types and result handling
//!
//! One crate-level error enum covers the four fault classes of the MC
//! protocol client:
//!
//! | Variant | Meaning | Retried? |
//! |---------|---------|----------|
//! | `Connection` | socket open/connect failure, PLC unreachable | no (caller may reconnect) |
//! | `Read` | response too short, payload-length mismatch, retries exhausted | partially (inside the retry loop) |
//! | `Write` | mirror of `Read` for write paths, including struct-encode failures | partially |
//! | `Schema` | missing string-length metadata, unsupported field kind | never (programming defect) |
//!
//! Cancellation is represented by [`McError::Cancelled`] and is always
//! propagated unmodified; the wrapping helpers in the client layer pass it
//! through untouched.

use std::io;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type McResult<T> = Result<T, McError>;

/// MC protocol client error type.
#[derive(Debug, Error)]
pub enum McError {
    /// Connection establishment or socket-level failure.
    #[error("Connection error: {message}")]
    Connection {
        /// Error description
        message: String,
    },

    /// Read-path failure (short/malformed response, retries exhausted,
    /// unsupported element type).
    #[error("Read error: {message}")]
    Read {
        /// Error description
        message: String,
    },

    /// Write-path failure, including struct-encode failures.
    #[error("Write error: {message}")]
    Write {
        /// Error description
        message: String,
    },

    /// Struct schema definition defect. Fatal and never retried.
    #[error("Schema error: {message}")]
    Schema {
        /// Error description
        message: String,
    },

    /// Invalid caller-supplied configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error description
        message: String,
    },

    /// Underlying I/O error from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation was cancelled by the caller's cancellation token.
    ///
    /// Never wrapped into any other variant.
    #[error("Operation cancelled")]
    Cancelled,
}

impl McError {
    /// Create a connection error.
    pub fn connection<S: Into<String>>(message: S) -> Self {
        McError::Connection {
            message: message.into(),
        }
    }

    /// Create a read error.
    pub fn read<S: Into<String>>(message: S) -> Self {
        McError::Read {
            message: message.into(),
        }
    }

    /// Create a write error.
    pub fn write<S: Into<String>>(message: S) -> Self {
        McError::Write {
            message: message.into(),
        }
    }

    /// Create a schema error.
    pub fn schema<S: Into<String>>(message: S) -> Self {
        McError::Schema {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        McError::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` for [`McError::Cancelled`].
    ///
    /// Error-wrapping call sites use this to keep cancellation unwrapped.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, McError::Cancelled)
    }

    /// Returns `true` if the error indicates a schema definition defect.
    #[inline]
    pub fn is_schema(&self) -> bool {
        matches!(self, McError::Schema { .. })
    }
}
