// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Walk the fabric name server with GA_NXT until it wraps around.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Name server enumeration.

use std::collections::BTreeSet;
use std::fmt;

use log::debug;

use crate::codec::{command, gs_subtype, gs_type, Cursor, PREAMBLE_LEN};
use crate::engine::{CtClient, CtRequest, Sleeper};
use crate::error::CodecError;
use crate::tables::{Fc4Protocols, PortType};
use crate::transport::CtPassThru;
use crate::types::{PortAddress, PortId, Wwn};

/// GA_NXT payload size including vendor extended fields.
pub const GA_NXT_RESPONSE_LEN: usize = 640;
/// Offset of the FC-4 protocol word inside a GA_NXT payload.
pub const FC4_PROTOCOL_OFFSET: usize = 560;

/// One registered name server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NsEntry {
    /// Registered port type.
    pub port_type: PortType,
    /// Fabric address.
    pub port_id: PortId,
    /// Port name.
    pub port_name: Wwn,
    /// FC-4 protocols advertised by the port.
    pub protocols: Fc4Protocols,
}

impl fmt::Display for NsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\t {} / 0x{:x} [{}]",
            self.port_name, self.port_id, self.port_type
        )?;
        let protocols = self.protocols.to_string();
        if !protocols.is_empty() {
            write!(f, " proto = {protocols}")?;
        }
        Ok(())
    }
}

/// Decode a GA_NXT accept payload.
pub fn parse_ga_nxt(payload: &[u8]) -> Result<NsEntry, CodecError> {
    let mut cursor = Cursor::new(payload);
    let port_type = PortType::from(cursor.read_u8()?);
    let id = cursor.read_bytes(3)?;
    let port_id = PortId::new(u32::from_be_bytes([0, id[0], id[1], id[2]]));
    let port_name = Wwn::new(cursor.read_u64()?);
    let raw = Cursor::at(payload, FC4_PROTOCOL_OFFSET).read_u32()?;
    Ok(NsEntry {
        port_type,
        port_id,
        port_name,
        protocols: Fc4Protocols::from_bits_truncate(raw),
    })
}

/// Result of a full name server walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NsListing {
    /// Entries in server order, after filtering.
    pub entries: Vec<NsEntry>,
    /// Set when a GA_NXT failed before the walk wrapped around.
    pub incomplete: bool,
}

impl<T: CtPassThru, S: Sleeper> CtClient<T, S> {
    /// GA_NXT: the entry registered after `port_id`.
    pub fn ns_get_next(&mut self, port_id: PortId) -> Option<NsEntry> {
        let key = port_id.raw().to_be_bytes();
        let request = CtRequest::service(
            command::GA_NXT,
            gs_type::DIRECTORY,
            gs_subtype::NAME_SERVER,
            &key,
            PREAMBLE_LEN + GA_NXT_RESPONSE_LEN,
        );
        let payload = self.send_ct(&request)?;
        parse_ga_nxt(&payload)
            .map_err(|err| debug!("GA_NXT response unusable: {err}"))
            .ok()
    }

    /// Walk the name server from address 0 until an id comes back a second
    /// time, keeping entries that match `filter`.
    pub fn walk_name_server(&mut self, filter: Option<PortAddress>) -> NsListing {
        let mut listing = NsListing::default();
        let mut seen = BTreeSet::new();
        let mut cursor = PortId::new(0);
        loop {
            let Some(entry) = self.ns_get_next(cursor) else {
                listing.incomplete = true;
                break;
            };
            if !seen.insert(entry.port_id) {
                debug!("name server wrapped at {}", entry.port_id);
                break;
            }
            cursor = entry.port_id;
            if filter.map_or(true, |want| want.matches(entry.port_name, entry.port_id)) {
                listing.entries.push(entry);
            }
        }
        listing
    }
}
