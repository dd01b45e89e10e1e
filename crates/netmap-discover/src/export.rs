//! Renderer handoff: Graphviz DOT and JSON snapshots of a `NetworkMap`.
//!
//! Layout is left entirely to the consumer (e.g. `dot -Tsvg`); this module
//! only decides labels and node styling.

use std::fmt::Write as _;
use std::path::Path;

use netmap_core::HostRecord;

use crate::error::Result;
use crate::mapper::NetworkMap;
use crate::topology::TOPOLOGY_NOTE;

/// Ports listed on a node label before collapsing into "(+N)".
const LABEL_PORTS: usize = 5;

/// Render the map's graph as an undirected Graphviz document.
pub fn to_dot(map: &NetworkMap) -> String {
    let mut out = String::new();
    let mut title = format!(
        "Network map - {}\n{} devices | {} connections",
        map.range,
        map.graph.node_count(),
        map.edge_count
    );
    if map.scan_ports {
        title.push_str(" | with port and OS scan");
    }

    let _ = writeln!(out, "graph network {{");
    let _ = writeln!(out, "  label=\"{}\";", escape(&title));
    let _ = writeln!(out, "  labelloc=t;");
    let _ = writeln!(out, "  comment=\"{}\";", escape(TOPOLOGY_NOTE));
    let _ = writeln!(
        out,
        "  node [shape=circle, style=filled, fontsize=8, penwidth=2];"
    );
    let _ = writeln!(out, "  edge [color=gray, fontsize=6];");

    for host in map.graph.nodes() {
        let (color, size) = node_style(host);
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\", fillcolor={color}, width={size}];",
            escape(host.address()),
            escape(&node_label(host, map.scan_ports)),
        );
    }

    for edge in map.graph.edges() {
        let _ = writeln!(
            out,
            "  \"{}\" -- \"{}\" [label=\"{}\", weight={}];",
            escape(&edge.source),
            escape(&edge.target),
            edge.connection_kind,
            edge.weight
        );
    }

    out.push_str("}\n");
    out
}

/// Pretty-printed JSON of the whole map.
pub fn to_json(map: &NetworkMap) -> Result<String> {
    Ok(serde_json::to_string_pretty(map)?)
}

pub fn write_dot(map: &NetworkMap, path: &Path) -> Result<()> {
    std::fs::write(path, to_dot(map))?;
    tracing::info!(path = %path.display(), "DOT diagram written");
    Ok(())
}

pub fn write_json(map: &NetworkMap, path: &Path) -> Result<()> {
    std::fs::write(path, to_json(map)?)?;
    tracing::info!(path = %path.display(), "JSON snapshot written");
    Ok(())
}

/// Multi-line node label: name, IP, MAC prefix, then OS and ports when scanned.
fn node_label(host: &HostRecord, scan_ports: bool) -> String {
    let mut label = format!("{}\nIP: {}", host.display_name, host.address());

    if host.has_hardware_address() {
        let prefix: String = host.hardware_address.chars().take(8).collect();
        let _ = write!(label, "\nMAC: {prefix}...");
    }

    if scan_ports && host.operating_system != netmap_core::UNKNOWN {
        let _ = write!(label, "\nOS: {}", host.operating_system);
    }

    if scan_ports && !host.open_ports.is_empty() {
        let shown: Vec<String> = host
            .open_ports
            .iter()
            .take(LABEL_PORTS)
            .map(|p| p.port_number.to_string())
            .collect();
        let _ = write!(label, "\nPorts: {}", shown.join(", "));
        if host.open_ports.len() > LABEL_PORTS {
            let _ = write!(label, "... (+{})", host.open_ports.len() - LABEL_PORTS);
        }
    }

    label
}

/// Colour and size by the role the hostname suggests.
fn node_style(host: &HostRecord) -> (&'static str, &'static str) {
    let name = host.display_name.to_lowercase();
    if name.contains("router") || name.contains("gateway") {
        ("red", "1.5")
    } else if name.contains("server") {
        ("orange", "1.3")
    } else if name.contains("switch") || name.contains("ap") {
        ("green", "1.2")
    } else {
        ("lightblue", "1.0")
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use netmap_core::{AddressRange, Enrichment, NetworkGraph, PortRecord, TransportProtocol};
    use uuid::Uuid;

    fn sample_map(scan_ports: bool) -> NetworkMap {
        let mut hosts = vec![
            HostRecord::discovered("192.168.1.1", Some("AA:BB:CC:DD:EE:01"), Some("Ubiquiti"), Some("router.lan")),
            HostRecord::discovered("192.168.1.10", None, None, Some("web \"prod\" server")),
            HostRecord::discovered("192.168.1.20", None, None, None),
        ];
        if scan_ports {
            let ports = (1..=7)
                .map(|i| PortRecord::new(8000 + i, TransportProtocol::Tcp, "http-alt"))
                .collect();
            hosts[1]
                .apply_enrichment(Enrichment {
                    ports,
                    os: "Linux 5.x (92%)".to_string(),
                })
                .unwrap();
        }
        let mut graph = NetworkGraph::from_hosts(&hosts);
        let edge_count = crate::topology::infer_topology(&hosts, &mut graph);

        NetworkMap {
            run_id: Uuid::nil(),
            range: AddressRange::parse("192.168.1.0/24").unwrap(),
            scan_ports,
            hosts,
            graph,
            edge_count,
            gateway: Some("192.168.1.1".to_string()),
            interrupted: false,
            started_at: Utc::now(),
            duration_ms: 1200,
        }
    }

    #[test]
    fn test_dot_contains_nodes_and_edges() {
        let dot = to_dot(&sample_map(false));
        assert!(dot.starts_with("graph network {"));
        assert!(dot.contains("\"192.168.1.1\" [label=\"router.lan\\nIP: 192.168.1.1\\nMAC: AA:BB:CC...\", fillcolor=red"));
        assert!(dot.contains("\"192.168.1.1\" -- \"192.168.1.10\" [label=\"network\", weight=1];"));
        assert!(dot.contains("\"192.168.1.1\" -- \"192.168.1.20\""));
        assert!(dot.contains("3 devices | 2 connections"));
        assert!(!dot.contains("OS:"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dot_escapes_and_lists_ports() {
        let dot = to_dot(&sample_map(true));
        assert!(dot.contains("web \\\"prod\\\" server"));
        assert!(dot.contains("fillcolor=orange"));
        assert!(dot.contains("OS: Linux 5.x (92%)"));
        assert!(dot.contains("Ports: 8001, 8002, 8003, 8004, 8005... (+2)"));
        assert!(dot.contains("with port and OS scan"));
    }

    #[test]
    fn test_json_snapshot() {
        let json: serde_json::Value =
            serde_json::from_str(&to_json(&sample_map(true)).unwrap()).unwrap();
        assert_eq!(json["range"], "192.168.1.0/24");
        assert_eq!(json["scan_ports"], true);
        assert_eq!(json["edge_count"], 2);
        assert_eq!(json["hosts"].as_array().unwrap().len(), 3);
        assert_eq!(json["graph"]["edges"].as_array().unwrap().len(), 2);
        assert_eq!(json["hosts"][1]["operating_system"], "Linux 5.x (92%)");
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let map = sample_map(false);
        let dot_path = dir.path().join("map.dot");
        let json_path = dir.path().join("map.json");

        write_dot(&map, &dot_path).unwrap();
        write_json(&map, &json_path).unwrap();

        assert_eq!(std::fs::read_to_string(&dot_path).unwrap(), to_dot(&map));
        assert!(std::fs::read_to_string(&json_path).unwrap().contains("\"edge_count\": 2"));
    }
}
