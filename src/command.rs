//! Device-block command construction
//!
//! Composes batch read/write commands for a device memory block into
//! frame-ready byte sequences, per the active frame variant. Each builder
//! returns the full request frame plus the minimum byte count a well-formed
//! response must have (the variant's fixed header length).

use crate::constants::{CMD_BATCH_READ, CMD_BATCH_WRITE, SUBCMD_WORD, SUBHEADER_1E_BATCH};
use crate::device::DeviceType;
use crate::frame::{FrameVariant, SessionParams};

/// A frame-ready request plus the minimum valid response length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Complete request frame bytes
    pub bytes: Vec<u8>,
    /// Minimum byte count of a well-formed response (fixed header length)
    pub min_response_len: usize,
}

/// Builds device-block commands for one frame variant and session.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder {
    variant: FrameVariant,
    session: SessionParams,
}

impl CommandBuilder {
    /// Create a builder for the given variant with default session fields.
    pub fn new(variant: FrameVariant) -> Self {
        Self {
            variant,
            session: SessionParams::default(),
        }
    }

    /// Create a builder with explicit session fields.
    pub fn with_session(variant: FrameVariant, session: SessionParams) -> Self {
        Self { variant, session }
    }

    /// Active frame variant.
    #[inline]
    pub fn variant(&self) -> FrameVariant {
        self.variant
    }

    /// Build a batch read command for `count` word units starting at
    /// `address` of `device`.
    pub fn build_read(&self, device: DeviceType, address: u32, count: u16) -> Command {
        self.build(device, address, count, None)
    }

    /// Build a batch write command carrying `payload` for `count` word units
    /// starting at `address` of `device`.
    pub fn build_write(
        &self,
        device: DeviceType,
        address: u32,
        count: u16,
        payload: &[u8],
    ) -> Command {
        self.build(device, address, count, Some(payload))
    }

    fn build(
        &self,
        device: DeviceType,
        address: u32,
        count: u16,
        payload: Option<&[u8]>,
    ) -> Command {
        let bytes = match self.variant {
            FrameVariant::Mc1E => {
                // 1E carries a 4-byte address and fixed device bytes; the
                // device code byte is not part of this legacy dialect.
                let mut data = Vec::with_capacity(8 + payload.map_or(0, <[u8]>::len));
                data.extend_from_slice(&address.to_le_bytes());
                data.push(0x20);
                data.push(0x44);
                data.push(count as u8);
                data.push(0x00);
                if let Some(p) = payload {
                    data.extend_from_slice(p);
                }
                self.session.build_1e(SUBHEADER_1E_BATCH, &data)
            }
            FrameVariant::Mc3E | FrameVariant::Mc4E => {
                // address(3 LE) + device code(1) + element count(2 LE)
                let mut data = Vec::with_capacity(6 + payload.map_or(0, <[u8]>::len));
                data.extend_from_slice(&address.to_le_bytes()[..3]);
                data.push(device.code());
                data.extend_from_slice(&count.to_le_bytes());

                let main_command = if let Some(p) = payload {
                    data.extend_from_slice(p);
                    CMD_BATCH_WRITE
                } else {
                    CMD_BATCH_READ
                };

                self.session.build_tcp(
                    main_command,
                    SUBCMD_WORD,
                    &data,
                    self.variant == FrameVariant::Mc4E,
                )
            }
        };

        Command {
            bytes,
            min_response_len: self.variant.header_len(),
        }
    }
}
