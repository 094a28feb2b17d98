// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Shared glue for the fc-ping and fc-show binaries.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Logging setup, adapter banners and client construction shared by the
//! command line tools.

use std::io::{self, Write};

use env_logger::Env;
use log::LevelFilter;

use crate::config::FcgsConfig;
use crate::engine::{CtClient, Sleeper};
use crate::error::Error;
use crate::hba::{open_adapter, AdapterAttr, AdapterSelector, HbaLibrary};

/// Log level implied by the `-v` and `-d` flags.
#[must_use]
pub fn log_level(verbose: bool, debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    }
}

/// Install `env_logger`; `RUST_LOG` overrides the flag derived level.
pub fn init_logging(verbose: bool, debug: bool) {
    let default_level = log_level(verbose, debug);
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

/// Adapter summary printed by the show tool in verbose mode.
pub fn write_adapter_banner<W: Write>(out: &mut W, adapter: &AdapterAttr) -> io::Result<()> {
    writeln!(out, "Using adapter BUS_ID    {}", adapter.bus_name)?;
    writeln!(out, "              Name      {}", adapter.wwpn)?;
    writeln!(out, "              N_Port_ID 0x{:x}", adapter.d_id)?;
    writeln!(out, "              OS-Device {}", adapter.dev_name.display())?;
    writeln!(out, "              Speed     {}", adapter.speed)
}

/// First line of a ping session.
pub fn write_ping_banner<W: Write>(
    out: &mut W,
    adapter: &AdapterAttr,
    verbose: bool,
) -> io::Result<()> {
    if verbose {
        writeln!(
            out,
            "Sending PNG from BUS_ID={} WWPN={} ID=0x{:x} dev={} speed={}",
            adapter.bus_name,
            adapter.wwpn,
            adapter.d_id,
            adapter.dev_name.display(),
            adapter.speed
        )
    } else {
        writeln!(
            out,
            "Sending PNG from BUS_ID={} speed={}",
            adapter.bus_name, adapter.speed
        )
    }
}

/// Open the adapter named by `selector` and wrap it in a client configured
/// from `config`.
pub fn connect<L, S>(
    library: &L,
    config: &FcgsConfig,
    selector: &AdapterSelector,
    sleeper: S,
    dump: bool,
) -> Result<(AdapterAttr, CtClient<L::PassThru, S>), Error>
where
    L: HbaLibrary,
    S: Sleeper,
{
    let (adapter, passthru) = open_adapter(library, selector)?;
    let mut client = CtClient::with_sleeper(passthru, sleeper).with_policy(config.retry_policy());
    client.set_dump(dump);
    Ok((adapter, client))
}
