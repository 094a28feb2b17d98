// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Map FC-GS codes to typed values and their display strings.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! FC-GS code tables. Every lookup has an explicit fallback so sparse or
//! vendor-specific codes never index past a table.

use core::fmt;

use bitflags::bitflags;

/// Placeholder rendered for codes missing from a table.
pub const UNKNOWN: &str = "Unknown";

/// CT reject reason codes.
pub mod reason {
    /// Invalid command code.
    pub const INVALID_COMMAND_CODE: u8 = 0x01;
    /// Invalid version level.
    pub const INVALID_VERSION_LEVEL: u8 = 0x02;
    /// Logical error.
    pub const LOGICAL_ERROR: u8 = 0x03;
    /// Invalid CT_IU size.
    pub const INVALID_CT_IU_SIZE: u8 = 0x04;
    /// Logical busy.
    pub const LOGICAL_BUSY: u8 = 0x05;
    /// Protocol error.
    pub const PROTOCOL_ERROR: u8 = 0x07;
    /// Unable to perform command request.
    pub const UNABLE_TO_PERFORM: u8 = 0x09;
    /// Command not supported.
    pub const COMMAND_NOT_SUPPORTED: u8 = 0x0b;
    /// Server not available.
    pub const SERVER_NOT_AVAILABLE: u8 = 0x0d;
    /// Session could not be established.
    pub const SESSION_NOT_ESTABLISHED: u8 = 0x0e;
    /// Vendor specific error.
    pub const VENDOR_SPECIFIC: u8 = 0xff;
}

/// CT reject reason code explanations used by the client.
pub mod explanation {
    /// No additional explanation.
    pub const NONE: u8 = 0x00;
    /// The server is still processing a request with the same token.
    pub const PROCESSING_REQUEST: u8 = 0xf4;
}

/// Text for a CT reject reason code.
#[must_use]
pub fn reason_text(code: u8) -> &'static str {
    match code {
        0x01 => "Invalid command code",
        0x02 => "Invalid version level",
        0x03 => "Logical error",
        0x04 => "Invalid CT_IU size",
        0x05 => "Logical busy",
        0x07 => "Protocol error",
        0x09 => "Unable to perform command request",
        0x0b => "Command not supported",
        0x0d => "Server not available",
        0x0e => "Session could not be established",
        0xff => "Vendor specific error",
        _ => UNKNOWN,
    }
}

/// Text for a CT reject reason code explanation.
#[must_use]
pub fn explanation_text(code: u8) -> &'static str {
    match code {
        0x00 => "No additional explanation",
        0x01 => "Port Identifier not registered",
        0x02 => "Port Name not registered",
        0x03 => "Node Name not registered",
        0x04 => "Class of service not registered",
        0x06 => "Initial process associator not registered",
        0x07 => "FC-4 type not registered",
        0x08 => "Symbolic Port Name not registered",
        0x09 => "Symbolic Node Name not registered",
        0x0a => "Port Type not registered",
        0x0c => "Fabric Port Name not registered",
        0x0d => "Hard Address not registered",
        0x0f => "FC-4 features not registered",
        0x10 => "Access denied",
        0x11 => "Unacceptable Port Identifier",
        0x12 => "Database empty",
        0x13 => "No object registered in the specified scope",
        0x14 => "Domain ID not set",
        0x15 => "Port Number not present",
        0x16 => "No device attached",
        0x30 => "Port List not available",
        0x31 => "Port Type not available",
        0x32 => "Physical Port Number not available",
        0x34 => "Attached Port Name List not available",
        0x36 => "Port State not available",
        0xf0 => "Authorization exception",
        0xf1 => "Authentication exception",
        0xf2 => "DB full",
        0xf3 => "DB empty",
        0xf4 => "Processing request",
        0xf5 => "Unable to verify connection",
        0xf6 => "Device not in a common zone",
        0xff => "",
        _ => UNKNOWN,
    }
}

/// Text for a port module type code (GPL).
#[must_use]
pub fn port_module_type_text(code: u8) -> &'static str {
    match code {
        0x01 => "Unknown",
        0x02 => "Other",
        0x03 => "Obsolete",
        0x04 => "Embedded",
        0x05 => "GLM",
        0x06 => "GBIC with serial ID",
        0x07 => "GBIC without serial ID",
        0x08 => "SFP with serial ID",
        0x09 => "SFP without serial ID",
        0x0a => "XFP",
        0x0b => "X2 Short",
        0x0c => "X2 Medium",
        0x0d => "X2 Tall",
        0x0e => "XPAK Short",
        0x0f => "XPAK Medium",
        0x10 => "XPAK TALL",
        0x11 => "XENPAK",
        0x12 => "SFP-DWDM",
        0x13 => "QSFP",
        _ => UNKNOWN,
    }
}

/// Text for a port TX type code (GPL).
#[must_use]
pub fn port_tx_type_text(code: u8) -> &'static str {
    match code {
        0x01 => "Unknown",
        0x02 => "Long wave laser - LL (1550nm)",
        0x03 => "Short wave laser - SN (850nm)",
        0x04 => "Long wave laser cost reduced - LC (1310 nm)",
        0x05 => "Electrical",
        0x06 => "10GBASE-SR 850nm laser",
        0x07 => "10GBASE-LR 1310nm laser",
        0x08 => "10GBASE-ER 1550nm laser",
        0x09 => "10GBASE-LX4 WWDM 1300nm laser",
        0x0a => "10GBASE-SW 850nm laser",
        0x0b => "10GBASE-LW 1310nm laser",
        0x0c => "10GBASE-EW 1550nm laser",
        _ => UNKNOWN,
    }
}

/// FC port type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortType {
    /// Unidentified.
    Unidentified,
    /// N_Port.
    N,
    /// NL_Port.
    Nl,
    /// F/NL_Port.
    FNl,
    /// Nx_Port.
    Nx,
    /// F_Port.
    F,
    /// FL_Port.
    Fl,
    /// E_Port (inter-switch link).
    E,
    /// B_Port.
    B,
    /// Not applicable.
    NotAvailable,
    /// Code outside the table.
    Other(u8),
}

impl From<u8> for PortType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Unidentified,
            0x01 => Self::N,
            0x02 => Self::Nl,
            0x03 => Self::FNl,
            0x7f => Self::Nx,
            0x81 => Self::F,
            0x82 => Self::Fl,
            0x84 => Self::E,
            0x85 => Self::B,
            0xff => Self::NotAvailable,
            other => Self::Other(other),
        }
    }
}

impl PortType {
    /// Display string for the port type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unidentified => "Unidentified",
            Self::N => "N_Port",
            Self::Nl => "NL_Port",
            Self::FNl => "F/NL_Port",
            Self::Nx => "Nx_Port",
            Self::F => "F_Port",
            Self::Fl => "FL_Port",
            Self::E => "E_Port",
            Self::B => "B_Port",
            Self::NotAvailable => "N/A",
            Self::Other(_) => UNKNOWN,
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interconnect element type from the element list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Unknown element.
    Unknown,
    /// Switch.
    Switch,
    /// Hub.
    Hub,
    /// Bridge.
    Bridge,
    /// Not applicable.
    NotAvailable,
    /// Code outside the table.
    Other(u8),
}

impl From<u8> for ElementType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Unknown,
            0x01 => Self::Switch,
            0x02 => Self::Hub,
            0x03 => Self::Bridge,
            0xff => Self::NotAvailable,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown | Self::Other(_) => UNKNOWN,
            Self::Switch => "Switch",
            Self::Hub => "Hub",
            Self::Bridge => "Bridge",
            Self::NotAvailable => "N/A",
        })
    }
}

/// Port state reported by GPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortState {
    /// State unknown or not retrievable.
    Unknown,
    /// Online.
    Online,
    /// Offline.
    Offline,
    /// Testing.
    Testing,
    /// Fault.
    Fault,
    /// Vendor specific.
    Vendor,
    /// Code outside the table.
    Other(u8),
}

impl From<u8> for PortState {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Unknown,
            0x01 => Self::Online,
            0x02 => Self::Offline,
            0x03 => Self::Testing,
            0x04 => Self::Fault,
            0xff => Self::Vendor,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown | Self::Other(_) => UNKNOWN,
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Testing => "Testing",
            Self::Fault => "Fault",
            Self::Vendor => "Vendor",
        })
    }
}

/// Negotiated adapter port speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PortSpeed {
    /// Speed not reported.
    #[default]
    Unknown,
    /// Link up but speed not negotiated.
    NotNegotiated,
    /// Negotiated speed in Gbit/s.
    Gbit(u32),
}

impl PortSpeed {
    /// Parse the `speed` attribute of an fc_host (`"8 Gbit"`, `"unknown"`, ...).
    #[must_use]
    pub fn from_sysfs(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("not negotiated") {
            return Self::NotNegotiated;
        }
        let gbit = trimmed
            .split_whitespace()
            .next()
            .and_then(|value| value.parse::<u32>().ok());
        match gbit {
            Some(value @ (1 | 2 | 4 | 8 | 10 | 16 | 32 | 64 | 128 | 256)) => Self::Gbit(value),
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for PortSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str(UNKNOWN),
            Self::NotNegotiated => f.write_str("not established"),
            Self::Gbit(value) => write!(f, "{value} GBit/s"),
        }
    }
}

bitflags! {
    /// FC-4 protocol bits found in the name server extended fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Fc4Protocols: u32 {
        /// SCSI-FCP.
        const SCSI_FCP = 0x0000_0100;
        /// FICON (both channel bits must be present).
        const FICON = 0x1800_0000;
    }
}

impl fmt::Display for Fc4Protocols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, label) in [(Self::SCSI_FCP, "SCSI-FCP"), (Self::FICON, "FICON")] {
            if self.contains(flag) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(label)?;
                first = false;
            }
        }
        Ok(())
    }
}
