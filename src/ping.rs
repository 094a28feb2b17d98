// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fabric ping (FPNG) with token renegotiation and latency statistics.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Fabric ping.
//!
//! FPNG does not go through the retrying engine: every exchange is a single
//! pass-through and the ping loop interprets the answer itself. A reject
//! with reason "logical error" / explanation "processing request" means the
//! token is already in use on the fabric; the token is bumped and the ping
//! resubmitted without counting against the requested echoes.

use std::fmt;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::codec::{command, PREAMBLE_LEN};
use crate::engine::{CtClient, CtRequest, Sleeper, NON_CONFORMING_BANNER};
use crate::error::{CtError, PingError};
use crate::transport::CtPassThru;
use crate::types::PortAddress;

/// FPNG payload revision.
pub const FPNG_REVISION: u32 = 0x0000_0001;
/// Tag for a fabric address target.
pub const FPNG_TAG_NPORT: u16 = 1;
/// Tag for a port name target.
pub const FPNG_TAG_WWPN: u16 = 2;
/// Response capacity of an FPNG exchange.
pub const FPNG_RESPONSE_LEN: usize = PREAMBLE_LEN + 4;

/// Encode the FPNG parameter block for `target` carrying `token`.
#[must_use]
pub fn encode_fpng(target: PortAddress, token: u32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(20);
    payload.extend_from_slice(&FPNG_REVISION.to_be_bytes());
    match target {
        PortAddress::Name(wwpn) => {
            payload.extend_from_slice(&FPNG_TAG_WWPN.to_be_bytes());
            payload.extend_from_slice(&8u16.to_be_bytes());
            payload.extend_from_slice(&wwpn.to_be_bytes());
        }
        PortAddress::Id(id) => {
            payload.extend_from_slice(&FPNG_TAG_NPORT.to_be_bytes());
            payload.extend_from_slice(&4u16.to_be_bytes());
            payload.extend_from_slice(&(id.raw() << 8).to_be_bytes());
        }
    }
    payload.extend_from_slice(&token.to_be_bytes());
    payload
}

/// Running round-trip statistics in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PingStats {
    min: u64,
    avg: f64,
    max: u64,
    count: u32,
}

impl PingStats {
    /// Fold one round trip into the statistics.
    pub fn record(&mut self, rtt: Duration) {
        let micros = u64::try_from(rtt.as_micros()).unwrap_or(u64::MAX);
        if self.count == 0 {
            self.min = micros;
            self.avg = micros as f64;
            self.max = micros;
            self.count = 1;
            return;
        }
        self.min = self.min.min(micros);
        self.max = self.max.max(micros);
        self.count += 1;
        self.avg += (micros as f64 - self.avg) / f64::from(self.count);
    }

    /// Number of recorded round trips.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Fastest round trip in milliseconds.
    #[must_use]
    pub fn min_ms(&self) -> f64 {
        self.min as f64 / 1000.0
    }

    /// Mean round trip in milliseconds.
    #[must_use]
    pub fn avg_ms(&self) -> f64 {
        self.avg / 1000.0
    }

    /// Slowest round trip in milliseconds.
    #[must_use]
    pub fn max_ms(&self) -> f64 {
        self.max as f64 / 1000.0
    }
}

impl fmt::Display for PingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n---------- ping statistics -----------")?;
        writeln!(
            f,
            "min/avg/max = {:.3}/{:.3}/{:.3} ms",
            self.min_ms(),
            self.avg_ms(),
            self.max_ms()
        )?;
        write!(f, "--------------------------------------")
    }
}

/// One accepted echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Echo {
    /// Pinged port.
    pub target: PortAddress,
    /// Token carried by the accepted request.
    pub token: u32,
    /// Measured round trip.
    pub rtt: Duration,
}

impl fmt::Display for Echo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\techo received from {} tok={} time={:.3} ms",
            self.target,
            self.token,
            self.rtt.as_micros() as f64 / 1000.0
        )
    }
}

/// Progress notifications handed to the ping observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingEvent {
    /// About to send a request with `token`.
    Sending {
        /// Token of the next request.
        token: u32,
    },
    /// The fabric reported `token` as busy; the next request uses `token + 1`.
    TokenInUse {
        /// Rejected token.
        token: u32,
    },
    /// The pass-through failed; `remaining` further failures are tolerated.
    NoResponse {
        /// Retries left before giving up.
        remaining: u32,
    },
    /// An echo was accepted.
    Echo(Echo),
}

/// Ping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingOptions {
    /// Echoes to collect.
    pub count: u32,
    /// First token to send.
    pub token: u32,
    /// Pause between successive echoes.
    pub interval: Duration,
    /// Extra attempts after a pass-through failure.
    pub no_response_retries: u32,
}

impl Default for PingOptions {
    fn default() -> Self {
        Self {
            count: 3,
            token: 0,
            interval: Duration::from_secs(1),
            no_response_retries: 2,
        }
    }
}

/// Ping session against one target.
#[derive(Debug, Clone)]
pub struct Pinger {
    target: PortAddress,
    options: PingOptions,
    token: u32,
    stats: PingStats,
}

impl Pinger {
    /// Prepare a session; nothing is sent yet.
    #[must_use]
    pub fn new(target: PortAddress, options: PingOptions) -> Self {
        Self {
            target,
            options,
            token: options.token,
            stats: PingStats::default(),
        }
    }

    /// Statistics collected so far.
    #[must_use]
    pub fn stats(&self) -> PingStats {
        self.stats
    }

    /// Token the next request will carry.
    #[must_use]
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Ping until `count` echoes arrived, an error ends the session or the
    /// observer breaks. Returns the number of echoes received.
    pub fn run<T, S, F>(&mut self, client: &mut CtClient<T, S>, mut observer: F) -> Result<u32, PingError>
    where
        T: CtPassThru,
        S: Sleeper,
        F: FnMut(&PingEvent) -> ControlFlow<()>,
    {
        let mut received = 0;
        let mut retries = self.options.no_response_retries;
        while received < self.options.count {
            if observer(&PingEvent::Sending { token: self.token }).is_break() {
                break;
            }
            let payload = encode_fpng(self.target, self.token);
            let request = CtRequest::fabric_config(command::FPNG, &payload, FPNG_RESPONSE_LEN);
            let start = Instant::now();
            let outcome = client.exchange(&request);
            let rtt = start.elapsed();
            match outcome {
                Err(CtError::Transport(err)) => {
                    if retries == 0 {
                        return Err(PingError::NoResponse(err));
                    }
                    retries -= 1;
                    debug!("FPNG without response: {err}");
                    if observer(&PingEvent::NoResponse { remaining: retries }).is_break() {
                        break;
                    }
                    continue;
                }
                Err(CtError::Reject(reason)) if reason.is_token_collision() => {
                    info!("token {} in use", self.token);
                    let busy = self.token;
                    self.token = self.token.wrapping_add(1);
                    if observer(&PingEvent::TokenInUse { token: busy }).is_break() {
                        break;
                    }
                }
                Err(CtError::Reject(reason)) => return Err(PingError::Rejected(reason)),
                Err(CtError::NonConforming(code)) => {
                    warn!("{NON_CONFORMING_BANNER}");
                    return Err(PingError::NonConforming(code));
                }
                Err(CtError::Malformed(err)) => return Err(PingError::Malformed(err)),
                Ok(_) => {
                    self.stats.record(rtt);
                    let echo = Echo {
                        target: self.target,
                        token: self.token,
                        rtt,
                    };
                    self.token = self.token.wrapping_add(1);
                    received += 1;
                    if observer(&PingEvent::Echo(echo)).is_break() {
                        break;
                    }
                    if received < self.options.count {
                        client.pause(self.options.interval);
                    }
                }
            }
            retries = self.options.no_response_retries;
        }
        Ok(received)
    }
}
