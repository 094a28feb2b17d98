// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for the fabric show tool.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! `fc-show`: print interconnect elements, ports, attached ports, the
//! inter-switch topology or the name server contents.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use fcgs::cli::{connect, init_logging, write_adapter_banner};
use fcgs::config::load_effective_config;
use fcgs::engine::ThreadSleeper;
use fcgs::error::Error;
use fcgs::hba::AdapterSelector;
use fcgs::topology::render::INCOMPLETE_BANNER;
use fcgs::topology::{discover, render, DisplayOptions, Filter, StateFilter};
use fcgs::types::{parse_number, PortAddress};

fn parse_domain(value: &str) -> Result<u8, String> {
    match parse_number(value).map(u8::try_from) {
        Some(Ok(domain)) if domain > 0 => Ok(domain),
        _ => Err("Invalid value.".to_owned()),
    }
}

fn parse_attached(value: &str) -> Result<PortAddress, String> {
    value.parse().map_err(|_| "Invalid value.".to_owned())
}

#[derive(Debug, Parser)]
#[command(
    name = "fc-show",
    author = "Lukas Bower",
    version,
    about = "Show Fibre Channel fabric elements, ports and topology"
)]
struct Cli {
    /// Source adapter specified by bus id, fc_host, S_ID or WWPN.
    #[arg(short = 'a', value_name = "ADAPTER")]
    adapter: Option<String>,
    /// Show online ports only.
    #[arg(short = 'o', default_value_t = false, conflicts_with = "offline")]
    online: bool,
    /// Show offline ports only.
    #[arg(short = 'O', default_value_t = false)]
    offline: bool,
    /// Show domain <ID> only.
    #[arg(
        short = 'i',
        value_name = "DOMAIN-ID",
        value_parser = parse_domain,
        conflicts_with_all = ["attached", "topology"]
    )]
    domain: Option<u8>,
    /// Show attached port <WWPN|ID> only.
    #[arg(
        short = 'p',
        value_name = "WWPN|ID",
        value_parser = parse_attached,
        conflicts_with = "topology"
    )]
    attached: Option<PortAddress>,
    /// Show topology information only.
    #[arg(short = 't', default_value_t = false)]
    topology: bool,
    /// Show local name server information.
    #[arg(short = 'n', default_value_t = false)]
    name_server: bool,
    /// Provide the result as CSV output.
    #[arg(
        short = 'c',
        default_value_t = false,
        conflicts_with_all = [
            "adapter", "online", "offline", "domain", "attached", "topology", "name_server",
            "verbose", "debug"
        ]
    )]
    csv: bool,
    /// Provide some debug output.
    #[arg(short = 'd', default_value_t = false)]
    debug: bool,
    /// Be verbose.
    #[arg(short = 'v', default_value_t = false)]
    verbose: bool,
    /// Configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn display_options(&self) -> DisplayOptions {
        let state = if self.online {
            StateFilter::OnlineOnly
        } else if self.offline {
            StateFilter::OfflineOnly
        } else {
            StateFilter::All
        };
        let filter = self
            .domain
            .map(Filter::Domain)
            .or(self.attached.map(Filter::Attached));
        DisplayOptions {
            verbose: self.verbose,
            csv: self.csv,
            state,
            filter,
            topology_only: self.topology,
        }
    }
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
            eprintln!("fc-show: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_effective_config(cli.config.clone())?;
    let selector: AdapterSelector = match cli.adapter.as_deref().unwrap_or_default().parse() {
        Ok(selector) => selector,
        Err(err) => {
            println!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let library = config.sysfs_hba();
    let (adapter, mut client) = match connect(&library, &config, &selector, ThreadSleeper, cli.debug)
    {
        Ok(connected) => connected,
        Err(Error::NoAdapter) => {
            println!("No adapter found.");
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => return Err(err).context("failed to open adapter"),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.verbose {
        write_adapter_banner(&mut out, &adapter)?;
    }

    if cli.name_server {
        let listing = client.walk_name_server(cli.attached);
        writeln!(out, "\nLocal Port List:")?;
        for entry in &listing.entries {
            writeln!(out, "{entry}")?;
        }
        if listing.incomplete {
            writeln!(out, "\n{INCOMPLETE_BANNER}")?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let options = cli.display_options();
    match discover(&mut client, &options) {
        Ok(fabric) => {
            render(&fabric, &options, &mut out)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::NoInterconnectElements) => {
            writeln!(out, "ERROR: no interconnect elements found.")?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err).context("fabric discovery failed"),
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("fc-show").chain(args.iter().copied()))
    }

    fn conflict(args: &[&str]) -> bool {
        matches!(parse(args), Err(err) if err.kind() == ErrorKind::ArgumentConflict)
    }

    #[test]
    fn csv_stands_alone() {
        assert!(conflict(&["-c", "-a", "0.0.1234"]));
        assert!(conflict(&["-c", "-v"]));
        assert!(conflict(&["-c", "-n"]));
        assert!(conflict(&["-c", "-o"]));
        let cli = parse(&["-c"]).expect("csv alone");
        assert!(cli.csv);
        assert!(cli.adapter.is_none());
        assert!(parse(&["-c", "--config", "/etc/fcgs.toml"]).is_ok());
    }

    #[test]
    fn filters_exclude_each_other() {
        assert!(conflict(&["-t", "-i", "3"]));
        assert!(conflict(&["-t", "-p", "0x10600"]));
        assert!(conflict(&["-i", "3", "-p", "0x10600"]));
        assert!(conflict(&["-o", "-O"]));
    }

    #[test]
    fn selectors_and_filters_combine() {
        let cli = parse(&["-a", "0.0.1234", "-o", "-i", "0x65", "-v"]).expect("valid flags");
        assert_eq!(cli.adapter.as_deref(), Some("0.0.1234"));
        let options = cli.display_options();
        assert_eq!(options.state, StateFilter::OnlineOnly);
        assert_eq!(options.filter, Some(Filter::Domain(0x65)));
        assert!(options.verbose);
    }

    #[test]
    fn zero_domain_is_refused() {
        assert!(matches!(
            parse(&["-i", "0"]),
            Err(err) if err.kind() == ErrorKind::ValueValidation
        ));
    }
}
