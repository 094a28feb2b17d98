// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Resolve user supplied adapter selectors against local FC adapters.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Local adapter enumeration contract and selector resolution.

use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

use log::{debug, info};

use crate::error::Error;
use crate::tables::PortSpeed;
use crate::transport::CtPassThru;
use crate::types::{parse_number, BusId, PortAddress, PortId, Wwn};

/// Attributes of one local FC adapter port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterAttr {
    /// SCSI host number (`hostN`).
    pub host: u32,
    /// Name of the bus device backing the adapter, e.g. `0.0.5923`.
    pub bus_name: String,
    /// Adapter port name.
    pub wwpn: Wwn,
    /// Fabric address assigned to the adapter port.
    pub d_id: PortId,
    /// OS device used for pass-through requests.
    pub dev_name: PathBuf,
    /// Negotiated link speed.
    pub speed: PortSpeed,
    /// Whether the port reports itself online.
    pub online: bool,
}

impl AdapterAttr {
    /// Channel bus id when the adapter sits on a CCW bus.
    #[must_use]
    pub fn bus_id(&self) -> Option<BusId> {
        self.bus_name.parse().ok()
    }

    /// `hostN` name of the adapter.
    #[must_use]
    pub fn host_name(&self) -> String {
        format!("host{}", self.host)
    }
}

/// How the user picked the source adapter (`-a`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdapterSelector {
    /// No selector: first online adapter, else the first one.
    #[default]
    Any,
    /// `c.s.dddd` bus id.
    BusId(BusId),
    /// Substring of the OS device name, e.g. `host3`.
    HostName(String),
    /// Adapter fabric address.
    PortId(PortId),
    /// Adapter port name.
    Wwpn(Wwn),
}

impl FromStr for AdapterSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::Any);
        }
        if trimmed.contains('.') {
            return trimmed.parse().map(Self::BusId);
        }
        if trimmed.contains("host") {
            return Ok(Self::HostName(trimmed.to_owned()));
        }
        match parse_number(trimmed) {
            Some(0) | None => Err(Error::InvalidSelector(s.to_owned())),
            Some(value) => Ok(match PortAddress::classify(value) {
                PortAddress::Name(wwpn) => Self::Wwpn(wwpn),
                PortAddress::Id(id) => Self::PortId(id),
            }),
        }
    }
}

impl fmt::Display for AdapterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::BusId(bus) => write!(f, "bus id {bus}"),
            Self::HostName(name) => write!(f, "device {name}"),
            Self::PortId(id) => write!(f, "port id {id}"),
            Self::Wwpn(wwpn) => write!(f, "WWPN {wwpn}"),
        }
    }
}

impl AdapterSelector {
    /// Whether `adapter` satisfies an explicit selector. `Any` matches all.
    #[must_use]
    pub fn matches(&self, adapter: &AdapterAttr) -> bool {
        match self {
            Self::Any => true,
            Self::BusId(bus) => adapter.bus_id() == Some(*bus),
            Self::HostName(name) => adapter.dev_name.to_string_lossy().contains(name.as_str()),
            Self::PortId(id) => adapter.d_id == *id,
            Self::Wwpn(wwpn) => adapter.wwpn == *wwpn,
        }
    }
}

/// Source of local adapters and their pass-through channels.
pub trait HbaLibrary {
    /// Pass-through produced by [`HbaLibrary::open`].
    type PassThru: CtPassThru;

    /// Enumerate local adapters in a stable order.
    fn adapters(&self) -> Result<Vec<AdapterAttr>, Error>;

    /// Open the pass-through channel of `adapter`.
    fn open(&self, adapter: &AdapterAttr) -> Result<Self::PassThru, Error>;
}

/// Pick the adapter matching `selector` from `adapters`.
pub fn resolve_adapter(
    adapters: &[AdapterAttr],
    selector: &AdapterSelector,
) -> Result<AdapterAttr, Error> {
    let chosen = match selector {
        AdapterSelector::Any => adapters
            .iter()
            .find(|adapter| adapter.online)
            .or_else(|| adapters.first()),
        explicit => adapters.iter().find(|adapter| explicit.matches(adapter)),
    };
    match chosen {
        Some(adapter) => {
            debug!("selector {selector} resolved to {}", adapter.host_name());
            Ok(adapter.clone())
        }
        None => {
            info!("no adapter among {} matches {selector}", adapters.len());
            Err(Error::NoAdapter)
        }
    }
}

/// Enumerate, resolve and open the adapter named by `selector`.
pub fn open_adapter<L: HbaLibrary>(
    library: &L,
    selector: &AdapterSelector,
) -> Result<(AdapterAttr, L::PassThru), Error> {
    let adapters = library.adapters()?;
    let adapter = resolve_adapter(&adapters, selector)?;
    let passthru = library.open(&adapter)?;
    Ok((adapter, passthru))
}
