// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Discover interconnect elements, their ports and inter-switch links.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Topology builder.
//!
//! Discovery walks every interconnect element depth first: domain id, port
//! list, then per port its state and physical port number, and for online
//! ports the attached ports and their fabric addresses. Every query is
//! issued regardless of what will eventually be printed; a failed query
//! leaves a hole in the model and marks the walk incomplete. Rendering
//! lives in [`render`].

pub mod render;

use std::collections::HashSet;

use log::{debug, info};

use crate::engine::{CtClient, Sleeper};
use crate::error::Error;
use crate::tables::{PortState, PortType};
use crate::transport::CtPassThru;
use crate::types::{
    AttachedPortName, IceConn, IceInfo, InterconnectElement, PortAddress, PortId, PortListEntry,
    Ppn, Wwn,
};

pub use render::render;

/// Which port states are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateFilter {
    /// Every port.
    #[default]
    All,
    /// Online ports only (`-o`).
    OnlineOnly,
    /// Offline ports only (`-O`).
    OfflineOnly,
}

impl StateFilter {
    /// Whether a port in `state` is printed.
    #[must_use]
    pub fn admits(self, state: PortState) -> bool {
        match self {
            Self::All => true,
            Self::OnlineOnly => state == PortState::Online,
            Self::OfflineOnly => state == PortState::Offline,
        }
    }
}

/// Single-value output filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Only the element with this domain id (`-i`).
    Domain(u8),
    /// Only paths to this attached port (`-p`).
    Attached(PortAddress),
}

/// Output options of the show tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayOptions {
    /// Port names, element details and the topology section.
    pub verbose: bool,
    /// Comma separated rows instead of text.
    pub csv: bool,
    /// Port state filter.
    pub state: StateFilter,
    /// Domain or attached port filter.
    pub filter: Option<Filter>,
    /// Print only the topology section.
    pub topology_only: bool,
}

impl DisplayOptions {
    /// Whether vendor and logical name details are fetched per element.
    #[must_use]
    pub fn wants_details(&self) -> bool {
        self.verbose && !self.csv && !self.topology_only
    }

    /// Whether the topology section is printed.
    #[must_use]
    pub fn wants_topology(&self) -> bool {
        self.topology_only || self.verbose
    }
}

/// Vendor data of an element fetched in verbose mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementDetails {
    /// GIEIL result.
    pub info: Option<IceInfo>,
    /// GIELN result.
    pub logical_name: Option<String>,
}

/// Attached port and its fabric address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachedReport {
    /// GAPNL entry.
    pub port: AttachedPortName,
    /// GID_PN result.
    pub d_id: Option<PortId>,
}

impl AttachedReport {
    /// Fabric address, zero when unknown.
    #[must_use]
    pub fn d_id_or_zero(&self) -> PortId {
        self.d_id.unwrap_or_default()
    }
}

/// One element port as observed during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortReport {
    /// GPL entry.
    pub entry: PortListEntry,
    /// GPS result.
    pub state: Option<PortState>,
    /// GPPN result.
    pub ppn: Option<Ppn>,
    /// GAPNL results, queried for online ports only.
    pub attached: Option<Vec<AttachedReport>>,
}

impl PortReport {
    /// State, `Unknown` when the query failed.
    #[must_use]
    pub fn state_or_unknown(&self) -> PortState {
        self.state.unwrap_or(PortState::Unknown)
    }

    /// Physical port number, not-found when the query failed.
    #[must_use]
    pub fn ppn_or_not_found(&self) -> Ppn {
        self.ppn.unwrap_or(Ppn::NotFound)
    }

    /// Attached ports, empty when none were queried or returned.
    #[must_use]
    pub fn attached_ports(&self) -> &[AttachedReport] {
        self.attached.as_deref().unwrap_or(&[])
    }
}

/// One interconnect element as observed during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementReport {
    /// GIEL entry.
    pub element: InterconnectElement,
    /// GDID result.
    pub domain_id: Option<u8>,
    /// GPL result with per-port observations.
    pub ports: Option<Vec<PortReport>>,
    /// Verbose details, when requested.
    pub details: Option<ElementDetails>,
}

impl ElementReport {
    /// Domain id, zero when unknown.
    #[must_use]
    pub fn domain_or_zero(&self) -> u8 {
        self.domain_id.unwrap_or(0)
    }

    /// Observed ports, empty when the port list failed.
    #[must_use]
    pub fn port_reports(&self) -> &[PortReport] {
        self.ports.as_deref().unwrap_or(&[])
    }
}

/// Everything learned in one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fabric {
    /// Elements in server order.
    pub elements: Vec<ElementReport>,
    /// Inter-switch link ends, one per attached port of an online E_Port.
    pub edges: Vec<IceConn>,
    /// Set when any query failed or came back empty.
    pub incomplete: bool,
}

/// A matched inter-switch link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Domain owning the near end.
    pub domain_id: u8,
    /// Physical port of the near end.
    pub ppn: Ppn,
    /// Domain owning the far end.
    pub remote_domain_id: u8,
    /// Physical port of the far end.
    pub remote_ppn: Ppn,
}

fn edge_key(a: Wwn, b: Wwn) -> (Wwn, Wwn) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Pair edges whose remote port is another edge's local port. Edges without
/// a partner are dropped; each link is reported once, from the edge found
/// first.
#[must_use]
pub fn correlate(edges: &[IceConn]) -> Vec<Link> {
    let mut emitted = HashSet::new();
    let mut links = Vec::new();
    for edge in edges {
        let Some(peer) = edges.iter().find(|other| other.local_port == edge.port_name) else {
            debug!("no peer for link end {}", edge.local_port);
            continue;
        };
        if !emitted.insert(edge_key(edge.local_port, peer.local_port)) {
            continue;
        }
        links.push(Link {
            domain_id: edge.domain_id,
            ppn: edge.ppn,
            remote_domain_id: peer.domain_id,
            remote_ppn: peer.ppn,
        });
    }
    links
}

fn mark(incomplete: &mut bool, what: &str, name: Wwn) {
    info!("{what} for {name} did not succeed");
    *incomplete = true;
}

fn walk_port<T: CtPassThru, S: Sleeper>(
    client: &mut CtClient<T, S>,
    entry: PortListEntry,
    incomplete: &mut bool,
) -> PortReport {
    let state = client.get_port_state(entry.port_name);
    if state.is_none() {
        mark(incomplete, "port state", entry.port_name);
    }
    let ppn = client.get_ppn(entry.port_name);
    if ppn.is_none() {
        mark(incomplete, "physical port number", entry.port_name);
    }
    let attached = if state == Some(PortState::Online) {
        let list = client.get_attached_port_list(entry.port_name);
        if list.as_ref().map_or(true, Vec::is_empty) {
            mark(incomplete, "attached port list", entry.port_name);
        }
        list.map(|ports| {
            ports
                .into_iter()
                .map(|port| {
                    let d_id = client.get_destination_id(port.port_name);
                    if d_id.is_none() {
                        mark(incomplete, "destination id", port.port_name);
                    }
                    AttachedReport { port, d_id }
                })
                .collect()
        })
    } else {
        None
    };
    PortReport {
        entry,
        state,
        ppn,
        attached,
    }
}

fn collect_edges(element: &ElementReport, edges: &mut Vec<IceConn>) {
    for port in element.port_reports() {
        if port.state != Some(PortState::Online) || port.entry.port_type != PortType::E {
            continue;
        }
        for attached in port.attached_ports() {
            edges.push(IceConn {
                domain_id: element.domain_or_zero(),
                ppn: port.ppn_or_not_found(),
                port_name: attached.port.port_name,
                local_port: port.entry.port_name,
            });
        }
    }
}

/// Walk the fabric reachable through `client`.
pub fn discover<T: CtPassThru, S: Sleeper>(
    client: &mut CtClient<T, S>,
    options: &DisplayOptions,
) -> Result<Fabric, Error> {
    let elements = match client.get_ice_list() {
        Some(elements) if !elements.is_empty() => elements,
        _ => return Err(Error::NoInterconnectElements),
    };
    let mut fabric = Fabric::default();
    for element in elements {
        let name = element.port_name;
        let domain_id = client.get_domain_id(name);
        if domain_id.map_or(true, |domain| domain == 0) {
            mark(&mut fabric.incomplete, "domain id", name);
        }
        let details = options.wants_details().then(|| {
            let details = ElementDetails {
                info: client.get_information_list(name),
                logical_name: client.get_logical_name(name),
            };
            if details.info.is_none() || details.logical_name.is_none() {
                mark(&mut fabric.incomplete, "element details", name);
            }
            details
        });
        let entries = client.get_port_list(name);
        if entries.as_ref().map_or(true, Vec::is_empty) {
            mark(&mut fabric.incomplete, "port list", name);
        }
        let ports = entries.map(|entries| {
            entries
                .into_iter()
                .map(|entry| walk_port(client, entry, &mut fabric.incomplete))
                .collect()
        });
        let report = ElementReport {
            element,
            domain_id,
            ports,
            details,
        };
        collect_edges(&report, &mut fabric.edges);
        fabric.elements.push(report);
    }
    Ok(fabric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(domain_id: u8, ppn: u32, local: u64, remote: u64) -> IceConn {
        IceConn {
            domain_id,
            ppn: Ppn::Number(ppn),
            port_name: Wwn::new(remote),
            local_port: Wwn::new(local),
        }
    }

    #[test]
    fn matched_edges_form_one_link() {
        let edges = [edge(1, 5, 0xa5, 0xb7), edge(2, 7, 0xb7, 0xa5)];
        assert_eq!(
            correlate(&edges),
            vec![Link {
                domain_id: 1,
                ppn: Ppn::Number(5),
                remote_domain_id: 2,
                remote_ppn: Ppn::Number(7),
            }]
        );
    }

    #[test]
    fn unmatched_edges_are_dropped() {
        let edges = [
            edge(1, 5, 0xa5, 0xb7),
            edge(2, 7, 0xb7, 0xa5),
            edge(1, 9, 0xa9, 0xdead),
        ];
        let links = correlate(&edges);
        assert_eq!(links.len(), 1);
        assert!(links.iter().all(|link| link.ppn != Ppn::Number(9)));
    }

    #[test]
    fn one_sided_discovery_still_links() {
        // A's edge points at a port that was never discovered.
        let edges = [edge(2, 7, 0xb7, 0xa5), edge(1, 5, 0xa5, 0xc1)];
        let links = correlate(&edges);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].domain_id, 2);
        assert_eq!(links[0].remote_domain_id, 1);
    }

    #[test]
    fn state_filter_admits_by_state() {
        assert!(StateFilter::All.admits(PortState::Testing));
        assert!(StateFilter::OnlineOnly.admits(PortState::Online));
        assert!(!StateFilter::OnlineOnly.admits(PortState::Offline));
        assert!(StateFilter::OfflineOnly.admits(PortState::Offline));
        assert!(!StateFilter::OfflineOnly.admits(PortState::Unknown));
    }
}
