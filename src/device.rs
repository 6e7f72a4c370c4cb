//! PLC device (soft element) addressing
//!
//! Maps the human-readable device names used in configuration files ("D",
//! "X", "M", ...) to the binary device codes of the QnA-compatible frame
//! dialects, and records whether a device class is conventionally addressed
//! in hexadecimal.
//!
//! The name set is closed: parsing an unknown name fails fast with a
//! configuration error, and the rest of the crate only ever sees the typed
//! [`DeviceType`] value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::McError;

/// PLC memory-region class (soft element type).
///
/// The numeric discriminant is the binary device code transmitted in
/// 3E/4E device-block commands.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceType {
    /// Internal relay
    M = 0x90,
    /// Special relay
    SM = 0x91,
    /// Latch relay
    L = 0x92,
    /// Annunciator
    F = 0x93,
    /// Edge relay
    V = 0x94,
    /// Step relay
    S = 0x98,
    /// Input
    X = 0x9C,
    /// Output
    Y = 0x9D,
    /// Link relay
    B = 0xA0,
    /// Link special relay
    SB = 0xA1,
    /// Direct access input
    DX = 0xA2,
    /// Direct access output
    DY = 0xA3,
    /// Data register
    D = 0xA8,
    /// Special register
    SD = 0xA9,
    /// File register (block switching)
    R = 0xAF,
    /// File register (serial number access)
    ZR = 0xB0,
    /// Link register
    W = 0xB4,
    /// Link special register
    SW = 0xB5,
    /// Timer coil
    TC = 0xC0,
    /// Timer contact
    TS = 0xC1,
    /// Timer current value
    TN = 0xC2,
    /// Counter coil
    CC = 0xC3,
    /// Counter contact
    CS = 0xC4,
    /// Counter current value
    CN = 0xC5,
    /// Retentive timer coil
    SC = 0xC6,
    /// Retentive timer contact
    SS = 0xC7,
    /// Retentive timer current value
    SN = 0xC8,
    /// Index register
    Z = 0xCC,
    /// Timer setting value
    TT = 0xCD,
    /// Timer main setting
    TM = 0xCE,
    /// Counter setting value
    CT = 0xCF,
    /// Counter main setting
    CM = 0xD0,
    /// Accumulator
    A = 0xD1,
}

impl DeviceType {
    /// Binary device code transmitted on the wire.
    #[inline]
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Returns `true` for the four device classes whose addresses are
    /// conventionally written in hexadecimal (X, Y, B, W).
    ///
    /// This is a display/formatting hint only. Wire encoding is always
    /// binary regardless of notation.
    #[inline]
    pub fn is_hex_addressed(&self) -> bool {
        matches!(
            self,
            DeviceType::X | DeviceType::Y | DeviceType::B | DeviceType::W
        )
    }

    /// Canonical upper-case name of the device class.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceType::M => "M",
            DeviceType::SM => "SM",
            DeviceType::L => "L",
            DeviceType::F => "F",
            DeviceType::V => "V",
            DeviceType::S => "S",
            DeviceType::X => "X",
            DeviceType::Y => "Y",
            DeviceType::B => "B",
            DeviceType::SB => "SB",
            DeviceType::DX => "DX",
            DeviceType::DY => "DY",
            DeviceType::D => "D",
            DeviceType::SD => "SD",
            DeviceType::R => "R",
            DeviceType::ZR => "ZR",
            DeviceType::W => "W",
            DeviceType::SW => "SW",
            DeviceType::TC => "TC",
            DeviceType::TS => "TS",
            DeviceType::TN => "TN",
            DeviceType::CC => "CC",
            DeviceType::CS => "CS",
            DeviceType::CN => "CN",
            DeviceType::SC => "SC",
            DeviceType::SS => "SS",
            DeviceType::SN => "SN",
            DeviceType::Z => "Z",
            DeviceType::TT => "TT",
            DeviceType::TM => "TM",
            DeviceType::CT => "CT",
            DeviceType::CM => "CM",
            DeviceType::A => "A",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceType {
    type Err = McError;

    /// Case-insensitive exact match against the closed name set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "M" => Ok(DeviceType::M),
            "SM" => Ok(DeviceType::SM),
            "L" => Ok(DeviceType::L),
            "F" => Ok(DeviceType::F),
            "V" => Ok(DeviceType::V),
            "S" => Ok(DeviceType::S),
            "X" => Ok(DeviceType::X),
            "Y" => Ok(DeviceType::Y),
            "B" => Ok(DeviceType::B),
            "SB" => Ok(DeviceType::SB),
            "DX" => Ok(DeviceType::DX),
            "DY" => Ok(DeviceType::DY),
            "D" => Ok(DeviceType::D),
            "SD" => Ok(DeviceType::SD),
            "R" => Ok(DeviceType::R),
            "ZR" => Ok(DeviceType::ZR),
            "W" => Ok(DeviceType::W),
            "SW" => Ok(DeviceType::SW),
            "TC" => Ok(DeviceType::TC),
            "TS" => Ok(DeviceType::TS),
            "TN" => Ok(DeviceType::TN),
            "CC" => Ok(DeviceType::CC),
            "CS" => Ok(DeviceType::CS),
            "CN" => Ok(DeviceType::CN),
            "SC" => Ok(DeviceType::SC),
            "SS" => Ok(DeviceType::SS),
            "SN" => Ok(DeviceType::SN),
            "Z" => Ok(DeviceType::Z),
            "TT" => Ok(DeviceType::TT),
            "TM" => Ok(DeviceType::TM),
            "CT" => Ok(DeviceType::CT),
            "CM" => Ok(DeviceType::CM),
            "A" => Ok(DeviceType::A),
            _ => Err(McError::configuration(format!(
                "Unsupported device type: {}",
                s
            ))),
        }
    }
}
