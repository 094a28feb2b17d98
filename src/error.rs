// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the error taxonomy for CT requests and fabric discovery.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Error types shared by the codec, transport, request engine and tools.

use core::fmt;
use std::io;
use std::path::PathBuf;

use crate::tables::{explanation_text, reason, reason_text};

/// Errors produced while framing or parsing CT information units.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer ended before the field being read.
    #[error("truncated CT_IU: needed {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to complete the read.
        needed: usize,
        /// Bytes available in the buffer.
        available: usize,
    },
    /// Response capacity cannot hold the preamble or is not word sized.
    #[error("response capacity {0} is not a word-aligned size beyond the preamble")]
    InvalidCapacity(usize),
    /// Response capacity does not fit the 16-bit size field.
    #[error("response capacity {0} exceeds the CT_IU size field")]
    CapacityTooLarge(usize),
}

/// Failure of a single pass-through call at the HBA level.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening or driving the pass-through device failed.
    #[error("pass-through I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The pass-through reported a nonzero status.
    #[error("pass-through returned status {0:#x}")]
    Status(u32),
    /// A page-aligned buffer could not be allocated.
    #[error("cannot allocate {0} byte aligned buffer")]
    Alloc(usize),
}

/// Decoded CT reject reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectReason {
    /// Reason code.
    pub code: u8,
    /// Reason code explanation.
    pub explanation: u8,
}

impl RejectReason {
    /// Whether the reject signals a ping token already in use.
    #[must_use]
    pub fn is_token_collision(&self) -> bool {
        self.code == reason::LOGICAL_ERROR
            && self.explanation == crate::tables::explanation::PROCESSING_REQUEST
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", reason_text(self.code))?;
        if self.code == reason::UNABLE_TO_PERFORM {
            write!(f, "-> {}.", explanation_text(self.explanation))?;
        }
        Ok(())
    }
}

/// Outcome of one CT exchange that did not produce an accept.
#[derive(Debug, thiserror::Error)]
pub enum CtError {
    /// The pass-through produced no response.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The response could not be framed.
    #[error("malformed response: {0}")]
    Malformed(#[from] CodecError),
    /// The server rejected the request.
    #[error("{0}")]
    Reject(RejectReason),
    /// The response code was neither accept nor reject.
    #[error("non-conforming response code {0:#06x}")]
    NonConforming(u16),
}

/// Terminal outcome of a fabric ping.
#[derive(Debug, thiserror::Error)]
pub enum PingError {
    /// The pass-through kept failing after the no-response retries.
    #[error("no response to FPNG: {0}")]
    NoResponse(#[source] TransportError),
    /// The server rejected the ping for a reason other than a busy token.
    #[error("{0}")]
    Rejected(RejectReason),
    /// The response code was neither accept nor reject.
    #[error("non-conforming response code {0:#06x}")]
    NonConforming(u16),
    /// The request or response could not be framed.
    #[error("malformed FPNG exchange: {0}")]
    Malformed(#[from] CodecError),
}

/// Top-level errors surfaced to the tools.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No local adapter matched the selector.
    #[error("No adapter found.")]
    NoAdapter,
    /// Selector or address could not be parsed.
    #[error("invalid value '{0}'")]
    InvalidSelector(String),
    /// The fabric reported no interconnect elements.
    #[error("no interconnect elements found")]
    NoInterconnectElements,
    /// A sysfs attribute could not be read or parsed.
    #[error("sysfs attribute {path}: {detail}")]
    Sysfs {
        /// Attribute path.
        path: PathBuf,
        /// Failure detail.
        detail: String,
    },
    /// Output or filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Transport failure opening an adapter.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
