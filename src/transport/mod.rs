// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Wrap one CT pass-through call with aligned buffers and tracing.
// Author: Lukas Bower

//! Transport adapter between the request engine and an HBA pass-through.
//!
//! The adapter owns no retry logic. One [`TransportAdapter::send`] is one
//! call into the pass-through: page-aligned, zero-filled request and
//! response buffers are prepared, the backend fills the response, and the
//! bytes are handed back as an owned vector.

pub mod bsg;

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::OnceLock;

use log::debug;

use crate::error::TransportError;

/// Log target used for hex dumps of CT buffers.
pub const DUMP_TARGET: &str = "fcgs::dump";

/// A single CT pass-through exchange against one local adapter.
pub trait CtPassThru {
    /// Send `request` and fill `response`. Implementations must not retry.
    fn pass_thru(&mut self, request: &[u8], response: &mut [u8]) -> Result<(), TransportError>;
}

impl<T: CtPassThru + ?Sized> CtPassThru for Box<T> {
    fn pass_thru(&mut self, request: &[u8], response: &mut [u8]) -> Result<(), TransportError> {
        (**self).pass_thru(request, response)
    }
}

fn page_size() -> usize {
    static PAGE: OnceLock<usize> = OnceLock::new();
    *PAGE.get_or_init(|| {
        // SAFETY: sysconf has no memory-safety preconditions.
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        usize::try_from(raw)
            .ok()
            .filter(|size| size.is_power_of_two())
            .unwrap_or(4096)
    })
}

/// Zero-filled heap buffer aligned to the system page size.
pub struct PageBuf {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// SAFETY: PageBuf owns its allocation exclusively.
unsafe impl Send for PageBuf {}

impl PageBuf {
    /// Allocate `len` zeroed bytes on a page boundary.
    pub fn zeroed(len: usize) -> Result<Self, TransportError> {
        let layout = Layout::from_size_align(len.max(1), page_size())
            .map_err(|_| TransportError::Alloc(len))?;
        // SAFETY: layout has nonzero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(TransportError::Alloc(len))?;
        Ok(Self { ptr, len, layout })
    }

    /// Build an aligned copy of `bytes`.
    pub fn copy_from(bytes: &[u8]) -> Result<Self, TransportError> {
        let mut buf = Self::zeroed(bytes.len())?;
        buf.as_mut_slice().copy_from_slice(bytes);
        Ok(buf)
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw pointer for handing the buffer to the kernel.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Immutable view of the buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for len initialised bytes for the lifetime of self.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Mutable view of the buffer.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for len initialised bytes and uniquely borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for PageBuf {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with this layout in `zeroed`.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// Render `bytes` as lines of four big-endian 32-bit words.
pub fn hex_lines(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(16)
        .map(|line| {
            line.chunks(4)
                .map(hex::encode)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn dump(label: &str, bytes: &[u8]) {
    debug!(target: DUMP_TARGET, "{label} ({} bytes)", bytes.len());
    for (index, line) in hex_lines(bytes).iter().enumerate() {
        debug!(target: DUMP_TARGET, "{:04x}: {line}", index * 16);
    }
}

/// Transport adapter over a pass-through backend.
pub struct TransportAdapter<T> {
    passthru: T,
    dump: bool,
}

impl<T: CtPassThru> TransportAdapter<T> {
    /// Wrap a backend; hex dumps start disabled.
    pub fn new(passthru: T) -> Self {
        Self {
            passthru,
            dump: false,
        }
    }

    /// Enable or disable hex dumps of both buffers around each call.
    pub fn set_dump(&mut self, dump: bool) {
        self.dump = dump;
    }

    /// Whether hex dumps are enabled.
    #[must_use]
    pub fn dump_enabled(&self) -> bool {
        self.dump
    }

    /// Backend access, mainly for tests.
    pub fn passthru(&self) -> &T {
        &self.passthru
    }

    /// Mutable backend access.
    pub fn passthru_mut(&mut self) -> &mut T {
        &mut self.passthru
    }

    /// Issue one pass-through of `request`, returning `response_capacity`
    /// bytes of response.
    pub fn send(
        &mut self,
        request: &[u8],
        response_capacity: usize,
    ) -> Result<Vec<u8>, TransportError> {
        let req = PageBuf::copy_from(request)?;
        let mut resp = PageBuf::zeroed(response_capacity)?;
        if self.dump {
            dump("request", req.as_slice());
        }
        let outcome = self
            .passthru
            .pass_thru(req.as_slice(), resp.as_mut_slice());
        if self.dump {
            dump("response", resp.as_slice());
        }
        match outcome {
            Ok(()) => Ok(resp.as_slice().to_vec()),
            Err(err) => {
                debug!("CT pass-through failed: {err}");
                Err(err)
            }
        }
    }
}
