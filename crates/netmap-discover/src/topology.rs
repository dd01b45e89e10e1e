//! Topology inference.
//!
//! The topology is a heuristic: the first host whose dotted address ends in
//! `.1` or `.254` is taken as the gateway, and every other host is attached
//! to it. The resulting star is an approximation, not an observed physical
//! layout.

use netmap_core::graph::DEFAULT_EDGE_WEIGHT;
use netmap_core::{ConnectionKind, HostRecord, NetworkGraph};

/// Address suffixes that mark a host as a likely gateway.
const GATEWAY_SUFFIXES: [&str; 2] = [".1", ".254"];

/// Short description attached to exported graphs and reports.
pub const TOPOLOGY_NOTE: &str =
    "Topology is inferred (star around a heuristically chosen gateway), not traced";

/// The first host, in list order, that looks like a gateway.
pub fn select_gateway(hosts: &[HostRecord]) -> Option<&HostRecord> {
    hosts.iter().find(|h| is_gateway_address(h.address()))
}

pub fn is_gateway_address(address: &str) -> bool {
    GATEWAY_SUFFIXES.iter().any(|s| address.ends_with(s))
}

/// Connect every host to the gateway and return the graph's edge count.
///
/// Hosts that are not graph nodes are skipped. Without a gateway (or with a
/// gateway that is not a node) the graph is left unchanged. Running this
/// twice adds nothing the second time.
pub fn infer_topology(hosts: &[HostRecord], graph: &mut NetworkGraph) -> usize {
    let Some(gateway) = select_gateway(hosts) else {
        tracing::info!(hosts = hosts.len(), "No gateway candidate; topology left empty");
        return graph.edge_count();
    };

    let gateway = gateway.address();
    if !graph.contains(gateway) {
        tracing::warn!(gateway = %gateway, "Gateway candidate is not a graph node");
        return graph.edge_count();
    }

    let mut added = 0usize;
    for host in hosts {
        if host.address() == gateway || !graph.contains(host.address()) {
            continue;
        }
        match graph.add_edge(gateway, host.address(), ConnectionKind::Network, DEFAULT_EDGE_WEIGHT) {
            Ok(true) => added += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!(address = %host.address(), error = %e, "Edge rejected"),
        }
    }

    tracing::info!(gateway = %gateway, edges_added = added, "Topology inferred");
    graph.edge_count()
}
