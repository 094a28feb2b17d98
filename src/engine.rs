// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Retry CT requests over the transport adapter and interpret responses.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Retrying request engine.
//!
//! [`CtClient::exchange`] performs exactly one pass-through and classifies the
//! answer. [`CtClient::send_ct`] layers the bounded retry on top of it: a
//! missing or non-conforming response is retried after a pause, a reject ends
//! the query, and every failure collapses to `None` for the caller.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::codec::{self, command, CtIuPreamble, ResponseCode};
use crate::error::CtError;
use crate::transport::{CtPassThru, TransportAdapter};

/// Fixed warning emitted when a management server answers outside the protocol.
pub const NON_CONFORMING_BANNER: &str = "*** Warning: Received \"non-conforming\" data from management server. ***\n\
***          Contact your switch supplier for support.              ***";

/// Source of pauses between attempts.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Retry bound and pause applied by [`CtClient::send_ct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per query, at least one.
    pub max_attempts: u32,
    /// Pause after a failed attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// One CT request: command, addressed service and the sizes involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtRequest<'a> {
    /// Command code.
    pub command: u16,
    /// Generic service type.
    pub gs_type: u8,
    /// Generic service subtype.
    pub gs_subtype: u8,
    /// Parameters following the preamble.
    pub payload: &'a [u8],
    /// Response buffer size, preamble included.
    pub response_size: usize,
}

impl<'a> CtRequest<'a> {
    /// Request to the fabric configuration server.
    #[must_use]
    pub fn fabric_config(command: u16, payload: &'a [u8], response_size: usize) -> Self {
        Self {
            command,
            gs_type: codec::gs_type::MANAGEMENT,
            gs_subtype: codec::gs_subtype::FABRIC_CONFIG,
            payload,
            response_size,
        }
    }

    /// Request to an arbitrary service.
    #[must_use]
    pub fn service(
        command: u16,
        gs_type: u8,
        gs_subtype: u8,
        payload: &'a [u8],
        response_size: usize,
    ) -> Self {
        Self {
            command,
            gs_type,
            gs_subtype,
            payload,
            response_size,
        }
    }
}

/// Accepted CT response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtResponse {
    /// Response preamble.
    pub preamble: CtIuPreamble,
    /// Bytes after the preamble, bounded by the response capacity.
    ///
    /// The preamble size field is not applied here. Switches commonly send
    /// accepts with a size of 0, so trimming to `size * 4` would drop valid
    /// payloads; each parser bounds its own reads instead.
    pub payload: Vec<u8>,
}

/// CT requester bound to one adapter.
pub struct CtClient<T, S = ThreadSleeper> {
    transport: TransportAdapter<T>,
    sleeper: S,
    policy: RetryPolicy,
}

impl<T: CtPassThru> CtClient<T> {
    /// Client pausing with `std::thread::sleep`.
    pub fn new(passthru: T) -> Self {
        Self::with_sleeper(passthru, ThreadSleeper)
    }
}

impl<T: CtPassThru, S: Sleeper> CtClient<T, S> {
    /// Client with an injected sleeper.
    pub fn with_sleeper(passthru: T, sleeper: S) -> Self {
        Self {
            transport: TransportAdapter::new(passthru),
            sleeper,
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy. Zero attempts are raised to one.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = RetryPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        self
    }

    /// Toggle hex dumps on the transport adapter.
    pub fn set_dump(&mut self, dump: bool) {
        self.transport.set_dump(dump);
    }

    /// Active retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Underlying transport adapter.
    pub fn transport(&self) -> &TransportAdapter<T> {
        &self.transport
    }

    /// Injected sleeper.
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Pause through the injected sleeper.
    pub fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }

    /// One pass-through of `request`, classified by response code.
    pub fn exchange(&mut self, request: &CtRequest<'_>) -> Result<CtResponse, CtError> {
        let frame = codec::encode_request(
            request.command,
            request.gs_type,
            request.gs_subtype,
            request.payload,
            request.response_size,
        )?;
        self.exchange_frame(&frame, request.response_size)
    }

    fn exchange_frame(&mut self, frame: &[u8], response_size: usize) -> Result<CtResponse, CtError> {
        let response = self.transport.send(frame, response_size)?;
        let (preamble, payload) = codec::decode_response(&response)?;
        match preamble.response_code() {
            ResponseCode::Accept => Ok(CtResponse {
                preamble,
                payload: payload.to_vec(),
            }),
            ResponseCode::Reject => Err(CtError::Reject(preamble.reject_reason())),
            ResponseCode::Other(code) => Err(CtError::NonConforming(code)),
        }
    }

    /// Issue `request` with bounded retry; `None` when no accept was obtained.
    pub fn send_ct(&mut self, request: &CtRequest<'_>) -> Option<Vec<u8>> {
        let name = command::name(request.command);
        let frame = match codec::encode_request(
            request.command,
            request.gs_type,
            request.gs_subtype,
            request.payload,
            request.response_size,
        ) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("cannot frame {name} request: {err}");
                return None;
            }
        };
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            let last = attempt == attempts;
            match self.exchange_frame(&frame, request.response_size) {
                Ok(response) => return Some(response.payload),
                Err(CtError::Reject(reason)) => {
                    info!("{name} rejected. {reason}");
                    return None;
                }
                Err(CtError::NonConforming(_) | CtError::Malformed(_)) if last => {
                    warn!("{NON_CONFORMING_BANNER}");
                }
                Err(err) => {
                    debug!("{name} attempt {attempt}/{attempts} failed: {err}");
                    if !last {
                        self.sleeper.sleep(self.policy.delay);
                    }
                }
            }
        }
        debug!("{name} gave up after {attempts} attempts");
        None
    }
}
