// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fibre Channel generic services client library behind fc-ping and fc-show.
// Author: Lukas Bower
#![warn(missing_docs)]

//! Fibre Channel management plane client.
//!
//! Requests are framed as CT_IUs by [`codec`], handed to an adapter through
//! [`transport`], retried by [`engine`] and decoded by [`query`]. On top of
//! that sit the fabric ping ([`ping`]), the name server walk
//! ([`nameserver`]) and the fabric topology builder ([`topology`]).

/// CT_IU framing and cursor reads.
pub mod codec;
/// Shared error types.
pub mod error;
/// Code tables and their display strings.
pub mod tables;
/// Fabric identifiers and parsed list entries.
pub mod types;

/// Pass-through adapter and the bsg backend.
pub mod transport;

/// Local adapter selection.
pub mod hba;
/// sysfs adapter enumeration.
pub mod sysfs;

/// Retrying request engine.
pub mod engine;
/// Fabric configuration server queries.
pub mod query;
/// Name server enumeration.
pub mod nameserver;
/// Fabric ping.
pub mod ping;
/// Fabric discovery and rendering.
pub mod topology;

/// TOML configuration.
pub mod config;
/// Command line glue.
pub mod cli;

pub use engine::{CtClient, CtRequest, CtResponse, RetryPolicy, Sleeper, ThreadSleeper};
pub use error::{CodecError, CtError, Error, PingError, RejectReason, TransportError};
pub use hba::{AdapterAttr, AdapterSelector, HbaLibrary};
pub use transport::CtPassThru;
pub use types::{PortAddress, PortId, Ppn, Wwn};
