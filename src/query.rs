// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Typed fabric configuration and name server queries.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! One typed query per CT command.
//!
//! Each query knows its command code, addressed service, parameter block and
//! response capacity, and decodes the accepted payload with a pure `parse_*`
//! function. A query yields `None` when the engine obtained no accept or the
//! payload did not fit its layout; callers treat both as missing data.

use log::debug;

use crate::codec::{command, gs_subtype, gs_type, Cursor, PREAMBLE_LEN};
use crate::engine::{CtClient, CtRequest, Sleeper};
use crate::error::CodecError;
use crate::tables::{ElementType, PortState, PortType};
use crate::transport::CtPassThru;
use crate::types::{AttachedPortName, IceInfo, InterconnectElement, PortId, PortListEntry, Ppn, Wwn};

/// Bytes per entry in element, port and attached port lists.
pub const LIST_ENTRY_LEN: usize = 12;
/// Element list capacity in entries.
pub const ICE_LIST_ENTRIES: usize = 100;
/// Port list capacity in entries.
pub const PORT_LIST_ENTRIES: usize = 500;
/// Attached port list capacity in entries.
pub const ATTACHED_LIST_ENTRIES: usize = 100;
/// Payload size reserved for GIEIL and GIELN strings.
pub const STRING_RESPONSE_LEN: usize = 256;

const fn list_response(entries: usize) -> usize {
    PREAMBLE_LEN + 4 + entries * LIST_ENTRY_LEN
}

fn read_list<T>(
    payload: &[u8],
    mut entry: impl FnMut(&mut Cursor<'_>) -> Result<T, CodecError>,
) -> Result<Vec<T>, CodecError> {
    let mut cursor = Cursor::new(payload);
    let count = cursor.read_u32()? as usize;
    let mut items = Vec::with_capacity(count.min(PORT_LIST_ENTRIES));
    for _ in 0..count {
        let start = cursor.position();
        let item = entry(&mut cursor)?;
        debug_assert_eq!(cursor.position() - start, LIST_ENTRY_LEN);
        items.push(item);
    }
    Ok(items)
}

/// Decode a GIEL payload: name, three reserved bytes, type at entry byte 11.
pub fn parse_ice_list(payload: &[u8]) -> Result<Vec<InterconnectElement>, CodecError> {
    read_list(payload, |cursor| {
        let port_name = Wwn::new(cursor.read_u64()?);
        cursor.skip(3)?;
        Ok(InterconnectElement {
            port_name,
            element_type: ElementType::from(cursor.read_u8()?),
        })
    })
}

/// Decode a GPL payload: name, one reserved byte, module, TX and port type.
pub fn parse_port_list(payload: &[u8]) -> Result<Vec<PortListEntry>, CodecError> {
    read_list(payload, |cursor| {
        let port_name = Wwn::new(cursor.read_u64()?);
        cursor.skip(1)?;
        Ok(PortListEntry {
            port_name,
            port_module_type: cursor.read_u8()?,
            port_tx_type: cursor.read_u8()?,
            port_type: PortType::from(cursor.read_u8()?),
        })
    })
}

/// Decode a GAPNL payload: name, two reserved bytes, flags and port type.
pub fn parse_attached_port_list(payload: &[u8]) -> Result<Vec<AttachedPortName>, CodecError> {
    read_list(payload, |cursor| {
        let port_name = Wwn::new(cursor.read_u64()?);
        cursor.skip(2)?;
        Ok(AttachedPortName {
            port_name,
            port_flags: cursor.read_u8()?,
            port_type: PortType::from(cursor.read_u8()?),
        })
    })
}

/// Low byte of the 16-bit GDID word.
pub fn parse_domain_id(payload: &[u8]) -> Result<u8, CodecError> {
    Ok((Cursor::new(payload).read_u16()? & 0xff) as u8)
}

/// State byte at payload offset 7 of GPS.
pub fn parse_port_state(payload: &[u8]) -> Result<PortState, CodecError> {
    Ok(PortState::from(Cursor::at(payload, 7).read_u8()?))
}

/// GPPN word, keeping the not-found sentinel distinct.
pub fn parse_ppn(payload: &[u8]) -> Result<Ppn, CodecError> {
    Ok(Ppn::from_raw(Cursor::new(payload).read_u32()?))
}

/// GID_PN word masked to 24 bits.
pub fn parse_destination_id(payload: &[u8]) -> Result<PortId, CodecError> {
    Ok(PortId::new(Cursor::new(payload).read_u32()?))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// GIEIL: length at offset 3, then NUL separated vendor, model and release.
pub fn parse_information_list(payload: &[u8]) -> Result<IceInfo, CodecError> {
    let mut cursor = Cursor::at(payload, 3);
    let len = cursor.read_u8()? as usize;
    let data = cursor.read_bytes(len)?;
    let mut fields = data.split(|byte| *byte == 0).map(lossy);
    Ok(IceInfo {
        vendor: fields.next().unwrap_or_default(),
        model: fields.next().unwrap_or_default(),
        release: fields.next().unwrap_or_default(),
    })
}

/// GIELN: length at offset 0, name follows and ends early at a NUL.
pub fn parse_logical_name(payload: &[u8]) -> Result<String, CodecError> {
    let mut cursor = Cursor::new(payload);
    let len = cursor.read_u8()? as usize;
    let raw = cursor.read_bytes(len)?;
    let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
    Ok(lossy(&raw[..end]))
}

impl<T: CtPassThru, S: Sleeper> CtClient<T, S> {
    fn query<R>(
        &mut self,
        request: CtRequest<'_>,
        parse: impl FnOnce(&[u8]) -> Result<R, CodecError>,
    ) -> Option<R> {
        let payload = self.send_ct(&request)?;
        match parse(&payload) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("{} response unusable: {err}", command::name(request.command));
                None
            }
        }
    }

    fn fcs_query<R>(
        &mut self,
        code: u16,
        name: Wwn,
        response_size: usize,
        parse: impl FnOnce(&[u8]) -> Result<R, CodecError>,
    ) -> Option<R> {
        let key = name.to_be_bytes();
        self.query(CtRequest::fabric_config(code, &key, response_size), parse)
    }

    /// GIEL: interconnect elements of the fabric.
    pub fn get_ice_list(&mut self) -> Option<Vec<InterconnectElement>> {
        self.query(
            CtRequest::fabric_config(command::GIEL, &[], list_response(ICE_LIST_ENTRIES)),
            parse_ice_list,
        )
    }

    /// GPL: ports of the element `ice_name`.
    pub fn get_port_list(&mut self, ice_name: Wwn) -> Option<Vec<PortListEntry>> {
        self.fcs_query(
            command::GPL,
            ice_name,
            list_response(PORT_LIST_ENTRIES),
            parse_port_list,
        )
    }

    /// GAPNL: ports attached to the element port `port_name`.
    pub fn get_attached_port_list(&mut self, port_name: Wwn) -> Option<Vec<AttachedPortName>> {
        self.fcs_query(
            command::GAPNL,
            port_name,
            list_response(ATTACHED_LIST_ENTRIES),
            parse_attached_port_list,
        )
    }

    /// GDID: domain id of the element `ice_name`.
    pub fn get_domain_id(&mut self, ice_name: Wwn) -> Option<u8> {
        self.fcs_query(command::GDID, ice_name, PREAMBLE_LEN + 4, parse_domain_id)
    }

    /// GPS: state of the element port `port_name`.
    pub fn get_port_state(&mut self, port_name: Wwn) -> Option<PortState> {
        self.fcs_query(command::GPS, port_name, PREAMBLE_LEN + 8, parse_port_state)
    }

    /// GPPN: physical port number of `port_name`.
    pub fn get_ppn(&mut self, port_name: Wwn) -> Option<Ppn> {
        self.fcs_query(command::GPPN, port_name, PREAMBLE_LEN + 4, parse_ppn)
    }

    /// GID_PN through the unzoned name server: fabric address of `port_name`.
    pub fn get_destination_id(&mut self, port_name: Wwn) -> Option<PortId> {
        let key = port_name.to_be_bytes();
        self.query(
            CtRequest::service(
                command::GID_PN,
                gs_type::MANAGEMENT,
                gs_subtype::NAME_SERVER,
                &key,
                PREAMBLE_LEN + 4,
            ),
            parse_destination_id,
        )
    }

    /// GIEIL: vendor, model and release of `ice_name`.
    pub fn get_information_list(&mut self, ice_name: Wwn) -> Option<IceInfo> {
        self.fcs_query(
            command::GIEIL,
            ice_name,
            PREAMBLE_LEN + STRING_RESPONSE_LEN,
            parse_information_list,
        )
    }

    /// GIELN: logical name of `ice_name`.
    pub fn get_logical_name(&mut self, ice_name: Wwn) -> Option<String> {
        self.fcs_query(
            command::GIELN,
            ice_name,
            PREAMBLE_LEN + STRING_RESPONSE_LEN,
            parse_logical_name,
        )
    }
}
