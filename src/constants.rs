//! MC protocol constants for the binary 1E/3E/4E frame variants
//!
//! All multi-byte fields on the wire are little-endian. The values below are
//! taken from the MELSEC communication protocol reference for QnA-compatible
//! 3E/4E frames and A-compatible 1E frames.

// ============================================================================
// Frame Header Constants
// ============================================================================

/// Frame type tag for QnA-compatible 3E request frames
pub const FRAME_TAG_3E: u16 = 0x0050;

/// Frame type tag for QnA-compatible 4E request frames
pub const FRAME_TAG_4E: u16 = 0x0054;

/// Response header length for 1E frames
///
/// Format: subheader(1) + complete code(1) = 2 bytes before payload
pub const HEADER_LEN_1E: usize = 2;

/// Response header length for 3E frames
///
/// Format: tag(2) + net#(1) + PC#(1) + IO#(2) + ch#(1) + datalen(2) +
/// result code(2) = 11 bytes before payload
pub const HEADER_LEN_3E: usize = 11;

/// Response header length for 4E frames
///
/// Format: tag(2) + serial#(2) + reserved(2) + net#(1) + PC#(1) + IO#(2) +
/// ch#(1) + datalen(2) + result code(2) = 15 bytes before payload
pub const HEADER_LEN_4E: usize = 15;

/// Number of header bytes counted inside the request data-length field
///
/// The data-length field covers the CPU timer (2), main command (2) and
/// sub command (2) in addition to the payload, so it equals payload + 6.
pub const DATA_LENGTH_OVERHEAD: usize = 6;

// ============================================================================
// Command Codes
// ============================================================================

/// Main command for device-block batch read (word units)
pub const CMD_BATCH_READ: u16 = 0x0401;

/// Main command for device-block batch write (word units)
pub const CMD_BATCH_WRITE: u16 = 0x1401;

/// Sub command for word-unit device access on Q/L series
pub const SUBCMD_WORD: u16 = 0x0000;

/// 1E frame subheader for device-block batch access
pub const SUBHEADER_1E_BATCH: u8 = 0x03;

// ============================================================================
// Default Session Parameters
// ============================================================================

/// Default serial number for 4E frames (fixed per session)
pub const DEFAULT_SERIAL_NUMBER: u16 = 0x0001;

/// Default network number (local network)
pub const DEFAULT_NETWORK_NUMBER: u8 = 0x00;

/// Default PC number (broadcast)
pub const DEFAULT_PC_NUMBER: u8 = 0xFF;

/// Default request destination module IO number (CPU module)
pub const DEFAULT_IO_NUMBER: u16 = 0x03FF;

/// Default request destination module station (channel) number
pub const DEFAULT_CHANNEL_NUMBER: u8 = 0x00;

/// Default CPU monitoring timer in 250ms units (0x0010 = 4 seconds)
pub const DEFAULT_CPU_TIMER: u16 = 0x0010;

// ============================================================================
// Transport Constants
// ============================================================================

/// Chunk size of the response read loop
///
/// The receive loop accumulates until a read returns fewer bytes than this
/// buffer, which marks the end of a response on an idle connection.
pub const READ_CHUNK_SIZE: usize = 256;

/// Default retry count for the execute-with-retry loop
pub const DEFAULT_MAX_RETRIES: u32 = 10;
