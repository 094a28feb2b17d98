// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Print discovered fabrics as text, CSV or a topology summary.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Text and CSV rendering of a [`Fabric`].

use std::io::{self, Write};

use super::{correlate, AttachedReport, DisplayOptions, ElementReport, Fabric, Filter, PortReport};
use crate::tables::{port_module_type_text, port_tx_type_text, PortState};

/// Header row of the CSV output.
pub const CSV_HEADER: &str = "ICE-name,domain,ICE-type,ppn,status,port name,port module type,\
port TX type,port type,att. port name,att. port ID,att. port type";

/// Trailer printed when any query of the walk failed.
pub const INCOMPLETE_BANNER: &str = "*** Warning: at least one command did not succeed. ***\n\
*** Data might be incomplete.                      ***";

fn write_element(out: &mut impl Write, report: &ElementReport) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Interconnect Element Name       0x{:x}",
        report.element.port_name
    )?;
    writeln!(
        out,
        "Interconnect Element Domain ID  {:03}",
        report.domain_or_zero()
    )?;
    writeln!(
        out,
        "Interconnect Element Type       {}",
        report.element.element_type
    )?;
    writeln!(
        out,
        "Interconnect Element Ports      {:03}",
        report.port_reports().len()
    )?;
    let Some(details) = &report.details else {
        return Ok(());
    };
    match &details.info {
        Some(info) => {
            writeln!(out, "Interconnect Element Vendor     {}", info.vendor)?;
            writeln!(out, "Interconnect Element Model      {}", info.model)?;
            writeln!(out, "Interconnect Element Rel. Code  {}", info.release)?;
        }
        None => {
            writeln!(out, "Interconnect Element Vendor     Error")?;
            writeln!(out, "Interconnect Element Model      Error")?;
            writeln!(out, "Interconnect Element Rel. Code  Error")?;
        }
    }
    writeln!(
        out,
        "Interconnect Element Log. Name  {}",
        details.logical_name.as_deref().unwrap_or("Error")
    )
}

fn write_port(out: &mut impl Write, port: &PortReport, verbose: bool) -> io::Result<()> {
    let state = port.state_or_unknown();
    let ppn = port.ppn_or_not_found();
    if !verbose {
        return writeln!(out, "\tICE Port {ppn}  {state}");
    }
    writeln!(out, "\n\tICE Port {ppn}  {state} [0x{:x}]", port.entry.port_name)?;
    if state != PortState::Offline {
        writeln!(
            out,
            "\tICE Port Type {} {} [{}]",
            port_module_type_text(port.entry.port_module_type),
            port_tx_type_text(port.entry.port_tx_type),
            port.entry.port_type
        )?;
    }
    Ok(())
}

fn write_attached(out: &mut impl Write, attached: &AttachedReport) -> io::Result<()> {
    writeln!(
        out,
        "\t\tAttached Port [WWPN/ID] 0x{:x} / 0x{:06x} [{}]",
        attached.port.port_name,
        attached.d_id_or_zero(),
        attached.port.port_type
    )
}

fn write_csv_row(
    out: &mut impl Write,
    element: &ElementReport,
    port: &PortReport,
    attached: Option<&AttachedReport>,
) -> io::Result<()> {
    write!(
        out,
        "0x{:016x},{:03},{},{},{},0x{:016x},{},{},{},",
        element.element.port_name,
        element.domain_or_zero(),
        element.element.element_type,
        port.ppn_or_not_found(),
        port.state_or_unknown(),
        port.entry.port_name,
        port_module_type_text(port.entry.port_module_type),
        port_tx_type_text(port.entry.port_tx_type),
        port.entry.port_type
    )?;
    match attached {
        Some(attached) => writeln!(
            out,
            "0x{:016x},0x{:06x},{}",
            attached.port.port_name,
            attached.d_id_or_zero(),
            attached.port.port_type
        ),
        None => writeln!(out, "n/a,n/a,n/a"),
    }
}

fn domain_admitted(options: &DisplayOptions, element: &ElementReport) -> bool {
    match options.filter {
        Some(Filter::Domain(domain)) => element.domain_or_zero() == domain,
        _ => true,
    }
}

fn render_csv(fabric: &Fabric, options: &DisplayOptions, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for element in &fabric.elements {
        if !domain_admitted(options, element) {
            continue;
        }
        for port in element.port_reports() {
            let state = port.state_or_unknown();
            if !options.state.admits(state) {
                continue;
            }
            let attached = port.attached_ports();
            if state != PortState::Online || attached.is_empty() {
                write_csv_row(out, element, port, None)?;
                continue;
            }
            for entry in attached {
                write_csv_row(out, element, port, Some(entry))?;
            }
        }
    }
    Ok(())
}

fn render_text(fabric: &Fabric, options: &DisplayOptions, out: &mut impl Write) -> io::Result<()> {
    for element in &fabric.elements {
        if !domain_admitted(options, element) {
            continue;
        }
        if let Some(Filter::Attached(target)) = options.filter {
            for port in element.port_reports() {
                if !options.state.admits(port.state_or_unknown()) {
                    continue;
                }
                for attached in port.attached_ports() {
                    if target.matches(attached.port.port_name, attached.d_id_or_zero()) {
                        write_element(out, element)?;
                        write_port(out, port, options.verbose)?;
                        write_attached(out, attached)?;
                    }
                }
            }
            continue;
        }
        write_element(out, element)?;
        for port in element.port_reports() {
            if !options.state.admits(port.state_or_unknown()) {
                continue;
            }
            write_port(out, port, options.verbose)?;
            for attached in port.attached_ports() {
                write_attached(out, attached)?;
            }
        }
    }
    Ok(())
}

/// Print the topology section: matched links grouped by near-end domain.
pub fn render_topology(fabric: &Fabric, out: &mut impl Write) -> io::Result<()> {
    if fabric.edges.is_empty() {
        return writeln!(out, "\n\t*** No topology information available ***");
    }
    writeln!(out, "\n\t*** Topology ***")?;
    let mut current = None;
    for link in correlate(&fabric.edges) {
        if current != Some(link.domain_id) {
            writeln!(out, "\nDomain {:03} attached via", link.domain_id)?;
            current = Some(link.domain_id);
        }
        writeln!(
            out,
            "\tphysical port {} to physical port {} of domain {}",
            link.ppn, link.remote_ppn, link.remote_domain_id
        )?;
    }
    Ok(())
}

/// Print `fabric` according to `options`, ending with the incomplete banner
/// when the walk lost data.
pub fn render(fabric: &Fabric, options: &DisplayOptions, out: &mut impl Write) -> io::Result<()> {
    if options.csv {
        render_csv(fabric, options, out)?;
    } else if !options.topology_only {
        render_text(fabric, options, out)?;
    }
    if options.wants_topology() && !options.csv {
        render_topology(fabric, out)?;
    }
    if fabric.incomplete {
        writeln!(out, "\n{INCOMPLETE_BANNER}")?;
    }
    Ok(())
}
