// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Frame and parse FC-GS common transport information units.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Encode/decode helpers for CT_IU requests and responses.
//!
//! Every CT_IU starts with a 16 byte preamble, all multi-byte fields in
//! network byte order. The `size` field of a request carries the number of
//! 32-bit words the requester can accept after the preamble.

use crate::error::{CodecError, RejectReason};

/// Length of the CT_IU preamble.
pub const PREAMBLE_LEN: usize = 16;
/// CT revision sent in every request.
pub const CT_REVISION: u8 = 0x03;
/// Response code signalling acceptance.
pub const ACCEPT: u16 = 0x8002;
/// Response code signalling rejection.
pub const REJECT: u16 = 0x8001;

/// Generic service types.
pub mod gs_type {
    /// Management service.
    pub const MANAGEMENT: u8 = 0xfa;
    /// Directory service.
    pub const DIRECTORY: u8 = 0xfc;
}

/// Generic service subtypes.
pub mod gs_subtype {
    /// Fabric configuration server.
    pub const FABRIC_CONFIG: u8 = 0x01;
    /// Name server (unzoned when reached through the management type).
    pub const NAME_SERVER: u8 = 0x02;
}

/// Command codes issued by this crate.
pub mod command {
    /// Get interconnect element list.
    pub const GIEL: u16 = 0x0101;
    /// Get domain identifier.
    pub const GDID: u16 = 0x0112;
    /// Get interconnect element logical name.
    pub const GIELN: u16 = 0x0115;
    /// Get interconnect element information list.
    pub const GIEIL: u16 = 0x0117;
    /// Get port list.
    pub const GPL: u16 = 0x0118;
    /// Get physical port number.
    pub const GPPN: u16 = 0x0122;
    /// Get attached port name list.
    pub const GAPNL: u16 = 0x0124;
    /// Get port state.
    pub const GPS: u16 = 0x0126;
    /// Fabric ping.
    pub const FPNG: u16 = 0x0401;
    /// Name server: get all next.
    pub const GA_NXT: u16 = 0x0100;
    /// Name server: get FC-4 features by port id.
    pub const GFF_ID: u16 = 0x011f;
    /// Name server: get port id by port name.
    pub const GID_PN: u16 = 0x0121;

    /// Mnemonic for log messages.
    #[must_use]
    pub fn name(code: u16) -> &'static str {
        match code {
            GIEL => "GIEL",
            GDID => "GDID",
            GIELN => "GIELN",
            GIEIL => "GIEIL",
            GPL => "GPL",
            GPPN => "GPPN",
            GAPNL => "GAPNL",
            GPS => "GPS",
            FPNG => "FPNG",
            GA_NXT => "GA_NXT",
            GFF_ID => "GFF_ID",
            GID_PN => "GID_PN",
            _ => "CT",
        }
    }
}

/// Classified response code of a CT_IU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    /// Accept (0x8002).
    Accept,
    /// Reject (0x8001).
    Reject,
    /// Anything else, including request codes echoed back.
    Other(u16),
}

impl From<u16> for ResponseCode {
    fn from(value: u16) -> Self {
        match value {
            ACCEPT => Self::Accept,
            REJECT => Self::Reject,
            other => Self::Other(other),
        }
    }
}

/// The 16 byte CT_IU preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CtIuPreamble {
    /// CT revision.
    pub revision: u8,
    /// Original requester id; zero for requests sent through an HBA.
    pub in_id: [u8; 3],
    /// Generic service type.
    pub gs_type: u8,
    /// Generic service subtype.
    pub gs_subtype: u8,
    /// Options byte.
    pub options: u8,
    /// Reserved.
    pub reserved: u8,
    /// Command or response code.
    pub code: u16,
    /// Maximum or residual size in 32-bit words.
    pub size: u16,
    /// Fragment id.
    pub fragment_id: u8,
    /// Reject reason code.
    pub reason_code: u8,
    /// Reject reason code explanation.
    pub reason_code_exp: u8,
    /// Vendor specific byte.
    pub vendor_specific: u8,
}

impl CtIuPreamble {
    /// Build a request preamble for `command` sized for `response_capacity`
    /// bytes (preamble included).
    pub fn request(
        command: u16,
        gs_type: u8,
        gs_subtype: u8,
        response_capacity: usize,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            revision: CT_REVISION,
            gs_type,
            gs_subtype,
            code: command,
            size: size_words(response_capacity)?,
            ..Self::default()
        })
    }

    /// Classify the code field.
    #[must_use]
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from(self.code)
    }

    /// Reason and explanation carried by a reject.
    #[must_use]
    pub fn reject_reason(&self) -> RejectReason {
        RejectReason {
            code: self.reason_code,
            explanation: self.reason_code_exp,
        }
    }

    /// Append the wire form of the preamble.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.revision);
        out.extend_from_slice(&self.in_id);
        out.push(self.gs_type);
        out.push(self.gs_subtype);
        out.push(self.options);
        out.push(self.reserved);
        out.extend_from_slice(&self.code.to_be_bytes());
        out.extend_from_slice(&self.size.to_be_bytes());
        out.push(self.fragment_id);
        out.push(self.reason_code);
        out.push(self.reason_code_exp);
        out.push(self.vendor_specific);
    }

    /// Parse a preamble from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(buf);
        let revision = cursor.read_u8()?;
        let mut in_id = [0u8; 3];
        in_id.copy_from_slice(cursor.read_bytes(3)?);
        Ok(Self {
            revision,
            in_id,
            gs_type: cursor.read_u8()?,
            gs_subtype: cursor.read_u8()?,
            options: cursor.read_u8()?,
            reserved: cursor.read_u8()?,
            code: cursor.read_u16()?,
            size: cursor.read_u16()?,
            fragment_id: cursor.read_u8()?,
            reason_code: cursor.read_u8()?,
            reason_code_exp: cursor.read_u8()?,
            vendor_specific: cursor.read_u8()?,
        })
    }
}

fn size_words(response_capacity: usize) -> Result<u16, CodecError> {
    let Some(body) = response_capacity.checked_sub(PREAMBLE_LEN) else {
        return Err(CodecError::InvalidCapacity(response_capacity));
    };
    if body % 4 != 0 {
        return Err(CodecError::InvalidCapacity(response_capacity));
    }
    u16::try_from(body / 4).map_err(|_| CodecError::CapacityTooLarge(response_capacity))
}

/// Frame a request: preamble followed by `payload`.
pub fn encode_request(
    command: u16,
    gs_type: u8,
    gs_subtype: u8,
    payload: &[u8],
    response_capacity: usize,
) -> Result<Vec<u8>, CodecError> {
    let preamble = CtIuPreamble::request(command, gs_type, gs_subtype, response_capacity)?;
    let mut frame = Vec::with_capacity(PREAMBLE_LEN + payload.len());
    preamble.encode_into(&mut frame);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Split a response buffer into its preamble and the bytes after it.
pub fn decode_response(buf: &[u8]) -> Result<(CtIuPreamble, &[u8]), CodecError> {
    let preamble = CtIuPreamble::decode(buf)?;
    Ok((preamble, &buf[PREAMBLE_LEN..]))
}

/// Big-endian reader over a borrowed payload.
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading at `offset`; bounds are checked on the first read.
    pub(crate) fn at(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, pos: offset }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.saturating_add(len);
        if end > self.buf.len() {
            return Err(CodecError::Truncated {
                needed: end,
                available: self.buf.len(),
            });
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        self.read_bytes(len).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, CodecError> {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(self.read_bytes(2)?);
        Ok(u16::from_be_bytes(raw))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, CodecError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_be_bytes(raw))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, CodecError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_be_bytes(raw))
    }
}
