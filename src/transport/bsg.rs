// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Issue CT pass-through requests through the Linux fc_host bsg node.
// Author: Lukas Bower

//! SG_IO v4 backend for `/dev/bsg/fc_hostN`.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use log::debug;

use super::CtPassThru;
use crate::codec::PREAMBLE_LEN;
use crate::error::TransportError;

const SG_IO: u32 = 0x2285;
const BSG_GUARD: i32 = b'Q' as i32;
const BSG_PROTOCOL_SCSI: u32 = 0;
const BSG_SUB_PROTOCOL_SCSI_TRANSPORT: u32 = 2;
const FC_BSG_HST_CT: u32 = 0x8000_0004;
const FC_BSG_REQUEST_LEN: usize = 20;
const FC_BSG_REPLY_LEN: usize = 64;

/// Mirror of `struct sg_io_v4` from `linux/bsg.h`.
#[repr(C)]
#[derive(Debug, Default)]
struct SgIoV4 {
    guard: i32,
    protocol: u32,
    subprotocol: u32,
    request_len: u32,
    request: u64,
    request_tag: u64,
    request_attr: u32,
    request_priority: u32,
    request_extra: u32,
    max_response_len: u32,
    response: u64,
    dout_iovec_count: u32,
    dout_xfer_len: u32,
    din_iovec_count: u32,
    din_xfer_len: u32,
    dout_xferp: u64,
    din_xferp: u64,
    timeout: u32,
    flags: u32,
    usr_ptr: u64,
    spare_in: u32,
    driver_status: u32,
    transport_status: u32,
    device_status: u32,
    retry_delay: u32,
    info: u32,
    duration: u32,
    response_len: u32,
    din_resid: i32,
    dout_resid: i32,
    generated_tag: u64,
    spare_out: u32,
    padding: u32,
}

/// Packed `fc_bsg_request` for `FC_BSG_HST_CT`.
///
/// Layout: msgcode (host order), reserved byte, 24-bit destination id,
/// then the first three preamble words as they appear on the wire.
fn host_ct_request(ct_iu: &[u8]) -> Result<[u8; FC_BSG_REQUEST_LEN], TransportError> {
    if ct_iu.len() < PREAMBLE_LEN {
        return Err(TransportError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "CT_IU shorter than its preamble",
        )));
    }
    let mut msg = [0u8; FC_BSG_REQUEST_LEN];
    msg[..4].copy_from_slice(&FC_BSG_HST_CT.to_ne_bytes());
    // Well-known address of the addressed service: FF.FF.<gs_type>.
    msg[5] = 0xff;
    msg[6] = 0xff;
    msg[7] = ct_iu[4];
    msg[8..20].copy_from_slice(&ct_iu[..12]);
    Ok(msg)
}

fn len_u32(len: usize) -> Result<u32, TransportError> {
    u32::try_from(len).map_err(|_| {
        TransportError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "buffer too large for SG_IO",
        ))
    })
}

/// CT pass-through bound to one fc_host bsg node.
#[derive(Debug)]
pub struct BsgPassThru {
    file: File,
    timeout_ms: u32,
}

impl BsgPassThru {
    /// Open a bsg node read/write.
    pub fn open(path: &Path, timeout_ms: u32) -> Result<Self, TransportError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("opened {} for CT pass-through", path.display());
        Ok(Self { file, timeout_ms })
    }
}

impl CtPassThru for BsgPassThru {
    fn pass_thru(&mut self, request: &[u8], response: &mut [u8]) -> Result<(), TransportError> {
        let mut msg = host_ct_request(request)?;
        let mut reply = [0u8; FC_BSG_REPLY_LEN];
        let mut hdr = SgIoV4 {
            guard: BSG_GUARD,
            protocol: BSG_PROTOCOL_SCSI,
            subprotocol: BSG_SUB_PROTOCOL_SCSI_TRANSPORT,
            request_len: len_u32(msg.len())?,
            request: msg.as_mut_ptr() as u64,
            max_response_len: len_u32(reply.len())?,
            response: reply.as_mut_ptr() as u64,
            dout_xfer_len: len_u32(request.len())?,
            dout_xferp: request.as_ptr() as u64,
            din_xfer_len: len_u32(response.len())?,
            din_xferp: response.as_mut_ptr() as u64,
            timeout: self.timeout_ms,
            ..SgIoV4::default()
        };
        // SAFETY: hdr points at buffers that outlive the synchronous ioctl and
        // whose lengths match the advertised sizes.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), SG_IO as _, &mut hdr) };
        if rc < 0 {
            return Err(io::Error::last_os_error().into());
        }
        for status in [hdr.driver_status, hdr.transport_status, hdr.device_status] {
            if status != 0 {
                return Err(TransportError::Status(status));
            }
        }
        let mut result = [0u8; 4];
        result.copy_from_slice(&reply[..4]);
        let result = i32::from_ne_bytes(result);
        if result != 0 {
            return Err(TransportError::Status(result as u32));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sg_io_v4_matches_kernel_size() {
        assert_eq!(std::mem::size_of::<SgIoV4>(), 160);
    }

    #[test]
    fn host_ct_request_carries_preamble_words() {
        let ct_iu = [
            0x03, 0, 0, 0, 0xfa, 0x01, 0, 0, 0x01, 0x01, 0x01, 0x2d, 0, 0, 0, 0,
        ];
        let msg = host_ct_request(&ct_iu).expect("request");
        assert_eq!(&msg[..4], &FC_BSG_HST_CT.to_ne_bytes());
        assert_eq!(&msg[4..8], &[0, 0xff, 0xff, 0xfa]);
        assert_eq!(&msg[8..], &ct_iu[..12]);
    }

    #[test]
    fn short_ct_iu_is_refused() {
        assert!(host_ct_request(&[0x03; 8]).is_err());
    }

    #[test]
    fn missing_node_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = BsgPassThru::open(&dir.path().join("fc_host9"), 1000).expect_err("missing");
        assert!(matches!(err, TransportError::Io(_)));
    }
}
