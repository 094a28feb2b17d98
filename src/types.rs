// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define Fibre Channel identifiers and fabric discovery records.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Fibre Channel identifiers and the records produced by fabric discovery.

use core::fmt;
use core::str::FromStr;

use crate::error::Error;
use crate::tables::{ElementType, PortType};

/// Mask selecting the bits that never appear in a 24-bit fabric address.
pub const WWN_DISCRIMINATOR_MASK: u64 = 0xFFFF_FFFF_FF00_0000;

/// 64-bit World Wide Name (port or node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Wwn(u64);

impl Wwn {
    /// Wrap a raw 64-bit name.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Access the raw 64-bit value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Network byte order encoding used in CT payloads.
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Wwn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Wwn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for Wwn {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// 24-bit fabric address (N_Port / D_ID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PortId(u32);

impl PortId {
    /// Wrap a fabric address, discarding anything above bit 23.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw & 0x00FF_FFFF)
    }

    /// Access the 24-bit value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06x}", self.0)
    }
}

impl fmt::LowerHex for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Channel-subsystem bus id of the form `c.s.dddd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId {
    /// Channel subsystem id.
    pub cssid: u8,
    /// Subchannel set id.
    pub ssid: u8,
    /// Device number.
    pub devno: u16,
}

impl BusId {
    /// Packed representation used by the HBA API vendor-specific id.
    #[must_use]
    pub fn packed(self) -> u32 {
        (u32::from(self.cssid) << 24) | (u32::from(self.ssid) << 16) | u32::from(self.devno)
    }
}

impl FromStr for BusId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidSelector(s.to_owned());
        let mut parts = s.trim().split('.');
        let (Some(cssid), Some(ssid), Some(devno), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Ok(Self {
            cssid: u8::from_str_radix(cssid, 16).map_err(|_| invalid())?,
            ssid: u8::from_str_radix(ssid, 16).map_err(|_| invalid())?,
            devno: u16::from_str_radix(devno, 16).map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}.{:x}.{:04x}", self.cssid, self.ssid, self.devno)
    }
}

/// Physical port number reported by the fabric configuration server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ppn {
    /// Valid physical port number (0 is valid).
    Number(u32),
    /// The server answered with the `0xFFFFFFFF` sentinel.
    NotFound,
}

impl Ppn {
    /// Sentinel value meaning "no physical port number".
    pub const SENTINEL: u32 = 0xFFFF_FFFF;

    /// Interpret the raw word returned by GPPN.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        if raw == Self::SENTINEL {
            Self::NotFound
        } else {
            Self::Number(raw)
        }
    }
}

impl fmt::Display for Ppn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value:03}"),
            Self::NotFound => f.write_str("n/a"),
        }
    }
}

/// One switch, hub or bridge in the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterconnectElement {
    /// Interconnect element name.
    pub port_name: Wwn,
    /// Type byte from the element list entry.
    pub element_type: ElementType,
}

/// One physical port on an interconnect element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortListEntry {
    /// Port name of the element port.
    pub port_name: Wwn,
    /// Raw port module type code.
    pub port_module_type: u8,
    /// Raw port TX type code.
    pub port_tx_type: u8,
    /// Port type of the element port.
    pub port_type: PortType,
}

/// End-device port attached to an interconnect element port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachedPortName {
    /// Attached port name.
    pub port_name: Wwn,
    /// Port flags byte.
    pub port_flags: u8,
    /// Attached port type.
    pub port_type: PortType,
}

/// Vendor information of an interconnect element (GIEIL).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IceInfo {
    /// Vendor name.
    pub vendor: String,
    /// Model name.
    pub model: String,
    /// Release code.
    pub release: String,
}

/// Inter-switch link edge collected during a topology walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IceConn {
    /// Domain id of the element owning `local_port`.
    pub domain_id: u8,
    /// Physical port number of `local_port`.
    pub ppn: Ppn,
    /// Remote port attached to `local_port`.
    pub port_name: Wwn,
    /// E_Port of this element.
    pub local_port: Wwn,
}

/// Parse a number the way `strtoull(value, NULL, 0)` does: `0x` hex,
/// leading `0` octal, decimal otherwise.
pub fn parse_number(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok();
    }
    if trimmed.len() > 1 && trimmed.starts_with('0') {
        return u64::from_str_radix(&trimmed[1..], 8).ok();
    }
    trimmed.parse::<u64>().ok()
}

/// Destination of a ping or filter value: a WWN or a fabric address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAddress {
    /// 64-bit port name.
    Name(Wwn),
    /// 24-bit fabric address.
    Id(PortId),
}

impl PortAddress {
    /// Values with any bit set above bit 23 are names, smaller ones addresses.
    #[must_use]
    pub fn classify(value: u64) -> Self {
        if value & WWN_DISCRIMINATOR_MASK != 0 {
            Self::Name(Wwn::new(value))
        } else {
            Self::Id(PortId::new(value as u32))
        }
    }

    /// Whether this address designates the supplied port.
    #[must_use]
    pub fn matches(&self, name: Wwn, id: PortId) -> bool {
        match self {
            Self::Name(wwn) => *wwn == name,
            Self::Id(port_id) => *port_id == id,
        }
    }
}

impl FromStr for PortAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_number(s) {
            Some(value) if value != 0 => Ok(Self::classify(value)),
            _ => Err(Error::InvalidSelector(s.to_owned())),
        }
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(wwn) => write!(f, "WWPN ({wwn})"),
            Self::Id(id) => write!(f, "D_ID (0x{id:x})"),
        }
    }
}
