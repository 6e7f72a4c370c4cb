//! MC frame construction and response parsing
//!
//! Three incompatible binary wire dialects are supported:
//!
//! | Variant | Request header | Response header | Tag |
//! |---------|----------------|-----------------|-----|
//! | 1E | subheader(1) + PC#(1) + timer(2) | subheader(1) + complete code(1) | none |
//! | 3E | tag(2) + net#(1) + PC#(1) + IO#(2) + ch#(1) + datalen(2) + timer(2) + cmd(2) + subcmd(2) | 11 bytes, result code last | 0x0050 |
//! | 4E | 3E layout with serial#(2) + reserved(2) after the tag | 15 bytes, result code last | 0x0054 |
//!
//! All multi-byte fields are little-endian. The variant is fixed per session
//! and never mixed mid-connection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DATA_LENGTH_OVERHEAD, DEFAULT_CHANNEL_NUMBER, DEFAULT_CPU_TIMER, DEFAULT_IO_NUMBER,
    DEFAULT_NETWORK_NUMBER, DEFAULT_PC_NUMBER, DEFAULT_SERIAL_NUMBER, FRAME_TAG_3E, FRAME_TAG_4E,
    HEADER_LEN_1E, HEADER_LEN_3E, HEADER_LEN_4E,
};
use crate::error::{McError, McResult};

/// MC wire-format dialect. Fixed for the lifetime of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameVariant {
    /// A-compatible 1E frame (legacy short form)
    Mc1E,
    /// QnA-compatible 3E frame
    Mc3E,
    /// QnA-compatible 4E frame (3E plus serial number)
    Mc4E,
}

impl FrameVariant {
    /// Fixed response header length in bytes before the payload.
    ///
    /// This is also the minimum byte count a well-formed response must have
    /// before result-code/payload extraction is attempted.
    #[inline]
    pub fn header_len(&self) -> usize {
        match self {
            FrameVariant::Mc1E => HEADER_LEN_1E,
            FrameVariant::Mc3E => HEADER_LEN_3E,
            FrameVariant::Mc4E => HEADER_LEN_4E,
        }
    }

    /// Canonical name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            FrameVariant::Mc1E => "MC1E",
            FrameVariant::Mc3E => "MC3E",
            FrameVariant::Mc4E => "MC4E",
        }
    }
}

impl fmt::Display for FrameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrameVariant {
    type Err = McError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MC1E" => Ok(FrameVariant::Mc1E),
            "MC3E" => Ok(FrameVariant::Mc3E),
            "MC4E" => Ok(FrameVariant::Mc4E),
            _ => Err(McError::configuration(format!(
                "Unsupported frame variant: {}",
                s
            ))),
        }
    }
}

/// Per-session protocol fields stamped into every request frame.
///
/// Defaults match the MELSEC reference values: broadcast PC number, CPU
/// module IO number and a 4-second monitoring timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParams {
    /// Serial number for 4E frames (fixed default here; a future session
    /// layer may increment it per exchange)
    pub serial_number: u16,
    /// Network number (0 = local)
    pub network_number: u8,
    /// PC number (0xFF = broadcast)
    pub pc_number: u8,
    /// Request destination module IO number
    pub io_number: u16,
    /// Request destination module station number
    pub channel_number: u8,
    /// CPU monitoring timer in 250ms units
    pub cpu_timer: u16,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            serial_number: DEFAULT_SERIAL_NUMBER,
            network_number: DEFAULT_NETWORK_NUMBER,
            pc_number: DEFAULT_PC_NUMBER,
            io_number: DEFAULT_IO_NUMBER,
            channel_number: DEFAULT_CHANNEL_NUMBER,
            cpu_timer: DEFAULT_CPU_TIMER,
        }
    }
}

impl SessionParams {
    /// Build a 1E request frame: subheader + PC number + timer + payload.
    pub fn build_1e(&self, subheader: u8, data: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(data.len() + 4);
        frame.push(subheader);
        frame.push(self.pc_number);
        frame.extend_from_slice(&self.cpu_timer.to_le_bytes());
        frame.extend_from_slice(data);
        frame
    }

    /// Build a 3E or 4E request frame.
    ///
    /// `include_serial` selects the 4E layout, which prepends a 2-byte serial
    /// number and 2 reserved zero bytes before the network number. The
    /// data-length field counts the timer, command and sub-command in
    /// addition to the payload (`data.len() + 6`).
    pub fn build_tcp(
        &self,
        main_command: u16,
        sub_command: u16,
        data: &[u8],
        include_serial: bool,
    ) -> Vec<u8> {
        let data_length = (data.len() + DATA_LENGTH_OVERHEAD) as u16;
        let tag = if include_serial {
            FRAME_TAG_4E
        } else {
            FRAME_TAG_3E
        };

        let mut frame = Vec::with_capacity(data.len() + 20);
        frame.extend_from_slice(&tag.to_le_bytes());
        if include_serial {
            frame.extend_from_slice(&self.serial_number.to_le_bytes());
            frame.extend_from_slice(&[0x00, 0x00]);
        }
        frame.push(self.network_number);
        frame.push(self.pc_number);
        frame.extend_from_slice(&self.io_number.to_le_bytes());
        frame.push(self.channel_number);
        frame.extend_from_slice(&data_length.to_le_bytes());
        frame.extend_from_slice(&self.cpu_timer.to_le_bytes());
        frame.extend_from_slice(&main_command.to_le_bytes());
        frame.extend_from_slice(&sub_command.to_le_bytes());
        frame.extend_from_slice(data);
        frame
    }

    /// Build a 3E request frame.
    #[inline]
    pub fn build_3e(&self, main_command: u16, sub_command: u16, data: &[u8]) -> Vec<u8> {
        self.build_tcp(main_command, sub_command, data, false)
    }

    /// Build a 4E request frame.
    #[inline]
    pub fn build_4e(&self, main_command: u16, sub_command: u16, data: &[u8]) -> Vec<u8> {
        self.build_tcp(main_command, sub_command, data, true)
    }
}

/// Decoded reply: PLC-reported result code plus the raw payload bytes.
///
/// A non-zero result code is a PLC-reported fault, not a transport fault;
/// it is returned as data for the caller layer to interpret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// PLC completion code (0 = success)
    pub result_code: u16,
    /// Payload bytes after the response header
    pub payload: Vec<u8>,
}

impl Response {
    /// Returns `true` if the PLC reported success.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.result_code == 0
    }
}

/// Parse a raw response into result code and payload.
///
/// Responses shorter than the variant's header minimum yield a zero-valued
/// [`Response`] rather than an error; the retry loop's own length check is
/// the enforcement point for truncated frames.
///
/// For 3E/4E frames the payload length is taken from the declared
/// data-length field (which counts the 2 result-code bytes); a declared
/// length that would read past the end of `raw` is a structural read error.
pub fn parse_response(variant: FrameVariant, raw: &[u8]) -> McResult<Response> {
    let min = variant.header_len();

    match variant {
        FrameVariant::Mc1E => {
            if raw.len() < min {
                return Ok(Response::default());
            }
            // Result code sits immediately before the payload start.
            let result_code = u16::from(raw[min - 2]);
            Ok(Response {
                result_code,
                payload: raw[min..].to_vec(),
            })
        }
        FrameVariant::Mc3E | FrameVariant::Mc4E => {
            if raw.len() < min {
                return Ok(Response::default());
            }
            let declared = u16::from_le_bytes([raw[min - 4], raw[min - 3]]) as usize;
            let result_code = u16::from_le_bytes([raw[min - 2], raw[min - 1]]);
            let payload_len = declared.checked_sub(2).ok_or_else(|| {
                McError::read(format!(
                    "Declared data length {} is below the result-code size",
                    declared
                ))
            })?;
            if min + payload_len > raw.len() {
                return Err(McError::read(format!(
                    "Response length {} is insufficient for {} payload bytes at offset {}",
                    raw.len(),
                    payload_len,
                    min
                )));
            }
            Ok(Response {
                result_code,
                payload: raw[min..min + payload_len].to_vec(),
            })
        }
    }
}

/// Check whether a raw response is malformed and needs a retry.
///
/// Responses shorter than `min_len` report `false` here; the retry loop
/// carries its own length check, and this predicate only flags frames whose
/// declared payload length disagrees with what was actually received.
///
/// Error replies (non-zero PLC result code) are never flagged as malformed:
/// their data-length field legitimately differs from a success reply's.
pub fn is_incorrect_response(variant: FrameVariant, raw: &[u8], min_len: usize) -> bool {
    if raw.len() < min_len {
        return false;
    }

    match variant {
        // 1E replies carry no declared length to cross-check.
        FrameVariant::Mc1E => false,
        FrameVariant::Mc3E | FrameVariant::Mc4E => {
            let declared = u16::from_le_bytes([raw[min_len - 4], raw[min_len - 3]]) as usize;
            let result_code = u16::from_le_bytes([raw[min_len - 2], raw[min_len - 1]]);
            let expected_payload = declared.wrapping_sub(2);
            result_code == 0 && expected_payload != raw.len() - min_len
        }
    }
}
