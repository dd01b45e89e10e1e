//! In-memory network graph handed to renderers and reporters.
//!
//! An undirected simple graph: nodes are hosts keyed by address (insertion
//! order preserved), edges are unordered address pairs. Adding an edge that
//! already exists, in either direction, leaves the graph unchanged.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{Enrichment, HostRecord};

/// Weight given to every inferred edge.
pub const DEFAULT_EDGE_WEIGHT: u32 = 1;

/// How two hosts are believed to be connected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Shared network segment, inferred rather than observed.
    Network,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network"),
        }
    }
}

/// An undirected edge between two host addresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub connection_kind: ConnectionKind,
    pub weight: u32,
}

impl GraphEdge {
    /// Whether this edge touches `address` on either end.
    pub fn touches(&self, address: &str) -> bool {
        self.source == address || self.target == address
    }
}

/// The graph produced by one discovery run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkGraph {
    nodes: Vec<HostRecord>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    node_index: HashMap<String, usize>,
    #[serde(skip)]
    edge_keys: HashSet<(usize, usize)>,
}

impl NetworkGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph with one node per host, in list order.
    pub fn from_hosts<'a>(hosts: impl IntoIterator<Item = &'a HostRecord>) -> Self {
        let mut graph = Self::new();
        for host in hosts {
            graph.add_node(host.clone());
        }
        graph
    }

    /// Insert a host. Returns `false` if its address is already a node, in
    /// which case the existing node is kept.
    pub fn add_node(&mut self, host: HostRecord) -> bool {
        if self.node_index.contains_key(host.address()) {
            tracing::debug!(address = %host.address(), "Duplicate node ignored");
            return false;
        }
        self.node_index
            .insert(host.address().to_string(), self.nodes.len());
        self.nodes.push(host);
        true
    }

    /// Whether a node with this address is in the graph.
    pub fn contains(&self, address: &str) -> bool {
        self.node_index.contains_key(address)
    }

    /// Look up a node by address.
    pub fn node(&self, address: &str) -> Option<&HostRecord> {
        self.node_index.get(address).map(|&i| &self.nodes[i])
    }

    /// Record a host's enrichment result on its node.
    pub fn apply_enrichment(&mut self, address: &str, enrichment: Enrichment) -> Result<()> {
        let idx = self.index_of(address)?;
        self.nodes[idx].apply_enrichment(enrichment)
    }

    /// Connect two existing nodes. Returns `Ok(false)` when the edge is
    /// already present.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        connection_kind: ConnectionKind,
        weight: u32,
    ) -> Result<bool> {
        let a = self.index_of(source)?;
        let b = self.index_of(target)?;
        if a == b {
            return Err(CoreError::SelfLoop {
                address: source.to_string(),
            });
        }

        let key = (a.min(b), a.max(b));
        if !self.edge_keys.insert(key) {
            return Ok(false);
        }

        self.edges.push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            connection_kind,
            weight,
        });
        Ok(true)
    }

    /// Whether `a` and `b` are connected, in either direction.
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.node_index.get(a), self.node_index.get(b)) {
            (Some(&x), Some(&y)) => self.edge_keys.contains(&(x.min(y), x.max(y))),
            _ => false,
        }
    }

    /// Addresses adjacent to `address`, in edge insertion order.
    pub fn neighbors(&self, address: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter_map(|e| {
                if e.source == address {
                    Some(e.target.as_str())
                } else if e.target == address {
                    Some(e.source.as_str())
                } else {
                    None
                }
            })
            .collect()
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[HostRecord] {
        &self.nodes
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn index_of(&self, address: &str) -> Result<usize> {
        self.node_index
            .get(address)
            .copied()
            .ok_or_else(|| CoreError::UnknownNode {
                address: address.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PortRecord, TransportProtocol};

    fn host(ip: &str) -> HostRecord {
        HostRecord::discovered(ip, None, None, None)
    }

    fn three_host_graph() -> NetworkGraph {
        let hosts = [host("10.0.0.1"), host("10.0.0.10"), host("10.0.0.20")];
        NetworkGraph::from_hosts(&hosts)
    }

    #[test]
    fn test_nodes_keep_insertion_order() {
        let graph = three_host_graph();
        let addrs: Vec<_> = graph.nodes().iter().map(|h| h.address()).collect();
        assert_eq!(addrs, vec!["10.0.0.1", "10.0.0.10", "10.0.0.20"]);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_node_is_ignored() {
        let mut graph = three_host_graph();
        let mut dup = HostRecord::discovered("10.0.0.1", None, None, Some("other"));
        dup.vendor = "Acme".to_string();
        assert!(!graph.add_node(dup));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.node("10.0.0.1").unwrap().display_name, "10.0.0.1");
    }

    #[test]
    fn test_edges_are_undirected_and_deduplicated() {
        let mut graph = three_host_graph();
        assert!(graph
            .add_edge("10.0.0.1", "10.0.0.10", ConnectionKind::Network, DEFAULT_EDGE_WEIGHT)
            .unwrap());
        assert!(!graph
            .add_edge("10.0.0.10", "10.0.0.1", ConnectionKind::Network, DEFAULT_EDGE_WEIGHT)
            .unwrap());
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge("10.0.0.10", "10.0.0.1"));
        assert!(!graph.has_edge("10.0.0.10", "10.0.0.20"));
    }

    #[test]
    fn test_edges_require_existing_nodes() {
        let mut graph = three_host_graph();
        let err = graph
            .add_edge("10.0.0.1", "10.0.0.99", ConnectionKind::Network, 1)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::UnknownNode {
                address: "10.0.0.99".to_string()
            }
        );

        let err = graph
            .add_edge("10.0.0.1", "10.0.0.1", ConnectionKind::Network, 1)
            .unwrap_err();
        assert!(matches!(err, CoreError::SelfLoop { .. }));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_neighbors() {
        let mut graph = three_host_graph();
        graph
            .add_edge("10.0.0.1", "10.0.0.10", ConnectionKind::Network, 1)
            .unwrap();
        graph
            .add_edge("10.0.0.20", "10.0.0.1", ConnectionKind::Network, 1)
            .unwrap();

        assert_eq!(graph.neighbors("10.0.0.1"), vec!["10.0.0.10", "10.0.0.20"]);
        assert_eq!(graph.neighbors("10.0.0.20"), vec!["10.0.0.1"]);
        assert!(graph.neighbors("10.0.0.99").is_empty());
    }

    #[test]
    fn test_apply_enrichment_updates_node() {
        let mut graph = three_host_graph();
        let enrichment = Enrichment {
            ports: vec![PortRecord::new(22, TransportProtocol::Tcp, "ssh")],
            os: "Linux 5.x (92%)".to_string(),
        };
        graph.apply_enrichment("10.0.0.10", enrichment).unwrap();

        let node = graph.node("10.0.0.10").unwrap();
        assert_eq!(node.operating_system, "Linux 5.x (92%)");
        assert_eq!(node.open_ports.len(), 1);

        let err = graph
            .apply_enrichment("10.0.0.99", Enrichment::unknown())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownNode { .. }));
    }

    #[test]
    fn test_serializes_nodes_and_edges() {
        let mut graph = three_host_graph();
        graph
            .add_edge("10.0.0.1", "10.0.0.10", ConnectionKind::Network, 1)
            .unwrap();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["edges"][0]["connection_kind"], "network");
        assert_eq!(json["edges"][0]["weight"], 1);
        assert!(json.get("node_index").is_none());
    }
}
