// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for the fabric ping tool.
// Author: Lukas Bower

//! `fc-ping`: send FPNG requests to a fabric port and report round trips.

use std::cell::Cell;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use fcgs::cli::{connect, init_logging, write_ping_banner};
use fcgs::config::load_effective_config;
use fcgs::engine::Sleeper;
use fcgs::error::{Error, PingError};
use fcgs::hba::AdapterSelector;
use fcgs::ping::{PingEvent, PingStats, Pinger};
use fcgs::types::{parse_number, PortAddress};

/// Last signal delivered, zero when none is pending.
static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn record_signal(sig: libc::c_int) {
    PENDING_SIGNAL.store(sig, Ordering::Relaxed);
}

fn install_signal_handlers() {
    for sig in [libc::SIGTERM, libc::SIGQUIT, libc::SIGINT, libc::SIGHUP] {
        // SAFETY: the handler only stores into an atomic.
        unsafe {
            libc::signal(sig, record_signal as *const () as libc::sighandler_t);
        }
    }
}

fn take_signal() -> Option<i32> {
    match PENDING_SIGNAL.swap(0, Ordering::Relaxed) {
        0 => None,
        sig => Some(sig),
    }
}

/// Sleeps in short slices so a terminating signal cuts the pause short.
///
/// SIGHUP prints the statistics seen so far and the pause runs to its end.
#[derive(Debug, Clone, Default)]
struct SignalAwareSleeper {
    seen: Rc<Cell<PingStats>>,
}

const SLEEP_SLICE: Duration = Duration::from_millis(50);

impl Sleeper for SignalAwareSleeper {
    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            match PENDING_SIGNAL.load(Ordering::Relaxed) {
                0 => {}
                libc::SIGHUP => {
                    PENDING_SIGNAL.store(0, Ordering::Relaxed);
                    print_stats(&self.seen.get());
                }
                _ => break,
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

fn parse_count(value: &str) -> Result<u32, String> {
    match parse_number(value).map(u32::try_from) {
        Some(Ok(count)) if count > 0 => Ok(count),
        _ => Err("Invalid value for count.".to_owned()),
    }
}

fn parse_token(value: &str) -> Result<u32, String> {
    match parse_number(value).map(u32::try_from) {
        Some(Ok(token)) => Ok(token),
        _ => Err("Invalid value.".to_owned()),
    }
}

fn parse_destination(value: &str) -> Result<PortAddress, String> {
    value
        .parse()
        .map_err(|_| format!("'{value}' is neither a WWPN nor a D_ID"))
}

#[derive(Debug, Parser)]
#[command(
    name = "fc-ping",
    author = "Lukas Bower",
    version,
    about = "Send fabric ping (FPNG) requests to a Fibre Channel port"
)]
struct Cli {
    /// Source adapter specified by bus id, fc_host, S_ID or WWPN.
    #[arg(short = 'a', value_name = "ADAPTER", default_value = "")]
    adapter: String,
    /// Number of ping requests to send.
    #[arg(short = 'c', value_name = "COUNT", default_value_t = 3, value_parser = parse_count)]
    count: u32,
    /// Token to send by ping request.
    #[arg(short = 't', value_name = "TOKEN", default_value_t = 0, value_parser = parse_token)]
    token: u32,
    /// Be verbose.
    #[arg(short = 'v', default_value_t = false)]
    verbose: bool,
    /// Provide some debug output.
    #[arg(short = 'd', default_value_t = false)]
    debug: bool,
    /// Configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Destination port.
    #[arg(value_name = "WWPN|D_ID", value_parser = parse_destination)]
    destination: PortAddress,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(cli.verbose, cli.debug);
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("fc-ping: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_stats(stats: &PingStats) {
    println!("{stats}");
    let _ = io::stdout().flush();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_effective_config(cli.config.clone())?;
    let selector: AdapterSelector = match cli.adapter.parse() {
        Ok(selector) => selector,
        Err(err) => {
            println!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let library = config.sysfs_hba();
    let sleeper = SignalAwareSleeper::default();
    let seen = Rc::clone(&sleeper.seen);
    let (adapter, mut client) =
        match connect(&library, &config, &selector, sleeper, cli.debug) {
            Ok(connected) => connected,
            Err(Error::NoAdapter) => {
                println!("No adapter found.");
                return Ok(ExitCode::FAILURE);
            }
            Err(err) => return Err(err).context("failed to open adapter"),
        };

    let mut stdout = io::stdout();
    write_ping_banner(&mut stdout, &adapter, cli.verbose)?;
    install_signal_handlers();

    let mut pinger = Pinger::new(
        cli.destination,
        config.ping_options(cli.count, cli.token),
    );
    let mut interrupted = false;
    let verbose = cli.verbose;
    let outcome = pinger.run(&mut client, |event| {
        match event {
            PingEvent::TokenInUse { token } if verbose => {
                println!("Warning: Token {token} in use. Incrementing.");
            }
            PingEvent::Echo(echo) => {
                let mut stats = seen.get();
                stats.record(echo.rtt);
                seen.set(stats);
                println!("{echo}");
            }
            _ => {}
        }
        match take_signal() {
            Some(libc::SIGHUP) => {
                print_stats(&seen.get());
                ControlFlow::Continue(())
            }
            Some(_) => {
                interrupted = true;
                ControlFlow::Break(())
            }
            None => ControlFlow::Continue(()),
        }
    });

    let code = match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(PingError::Rejected(reason)) => {
            if verbose {
                println!("{reason}");
            }
            println!("Error received for FPNG request, aborting.");
            ExitCode::FAILURE
        }
        Err(err) => {
            log::info!("ping aborted: {err}");
            println!("Error received for FPNG request, aborting.");
            ExitCode::FAILURE
        }
    };
    print_stats(&pinger.stats());
    Ok(if interrupted { ExitCode::SUCCESS } else { code })
}
