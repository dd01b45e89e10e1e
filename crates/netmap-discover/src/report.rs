//! Plain-text network report.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::mapper::NetworkMap;
use crate::topology::TOPOLOGY_NOTE;

const RULE_WIDTH: usize = 60;
/// Hosts listed under each service before collapsing into "... and N more".
const SERVICE_HOSTS_SHOWN: usize = 3;

/// Render the report for `map`, stamped with `generated_at`.
pub fn render_text_report(map: &NetworkMap, generated_at: DateTime<Local>) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut lines: Vec<String> = Vec::new();

    lines.push(heavy.clone());
    lines.push("           NETWORK REPORT - NETMAP".to_string());
    lines.push(heavy.clone());
    lines.push(format!("Date: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(format!("Scanned range: {}", map.range));
    lines.push(format!("Hosts found: {}", map.hosts.len()));
    lines.push(format!(
        "Port scan: {}",
        if map.scan_ports { "YES" } else { "NO" }
    ));
    if map.interrupted {
        lines.push("Status: INTERRUPTED (partial results)".to_string());
    }
    lines.push(heavy.clone());
    lines.push(String::new());

    lines.push("HOST DETAILS:".to_string());
    lines.push(light.clone());
    for (i, host) in map.hosts.iter().enumerate() {
        lines.push(format!("\n{}. {}", i + 1, host.display_name));
        lines.push(format!("   IP: {}", host.address()));
        lines.push(format!("   MAC: {}", host.hardware_address));
        lines.push(format!("   Vendor: {}", host.vendor));

        if map.scan_ports {
            lines.push(format!("   Operating system: {}", host.operating_system));
            if host.open_ports.is_empty() {
                lines.push("   No open ports found".to_string());
            } else {
                lines.push(format!("   OPEN PORTS ({}):", host.open_ports.len()));
                for port in &host.open_ports {
                    lines.push(format!(
                        "      {}/{} - {}",
                        port.port_number, port.transport_protocol, port.service_description
                    ));
                }
            }
        }
    }

    if map.scan_ports {
        lines.push(format!("\n{heavy}"));
        lines.push("SERVICES FOUND:".to_string());
        lines.push(light.clone());

        for (service, addresses) in services_summary(map) {
            lines.push(format!("{service}: {} hosts", addresses.len()));
            for address in addresses.iter().take(SERVICE_HOSTS_SHOWN) {
                lines.push(format!("  - {address}"));
            }
            if addresses.len() > SERVICE_HOSTS_SHOWN {
                lines.push(format!(
                    "  ... and {} more",
                    addresses.len() - SERVICE_HOSTS_SHOWN
                ));
            }
        }
    }

    lines.push(format!("\n{heavy}"));
    lines.push("STATISTICS:".to_string());
    lines.push(light);

    let total_ports: usize = map.hosts.iter().map(|h| h.open_ports.len()).sum();
    lines.push(format!("Total hosts: {}", map.hosts.len()));
    lines.push(format!("Total open ports: {total_ports}"));

    // Ties go to the host listed first.
    let busiest = map
        .hosts
        .iter()
        .rev()
        .max_by_key(|h| h.open_ports.len());
    if let Some(host) = busiest {
        lines.push(format!(
            "Host with most ports: {} ({} ports)",
            host.address(),
            host.open_ports.len()
        ));
    }

    lines.push(format!("Connections detected: {}", map.edge_count));
    if let Some(gateway) = &map.gateway {
        lines.push(format!("Assumed gateway: {gateway}"));
    }
    lines.push(format!("Note: {TOPOLOGY_NOTE}"));

    lines.join("\n")
}

/// Write the report for `map` to `path`, stamped with the current local time.
pub fn write_text_report(map: &NetworkMap, path: &Path) -> Result<()> {
    std::fs::write(path, render_text_report(map, Local::now()))?;
    tracing::info!(path = %path.display(), "Text report written");
    Ok(())
}

/// `"port/service"` → addresses exposing it, in first-seen order.
fn services_summary(map: &NetworkMap) -> Vec<(String, Vec<&str>)> {
    let mut order: Vec<String> = Vec::new();
    let mut by_service: HashMap<String, Vec<&str>> = HashMap::new();

    for host in &map.hosts {
        for port in &host.open_ports {
            let key = format!("{}/{}", port.port_number, port.service_description);
            let entry = by_service.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            entry.push(host.address());
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_service.remove(&key).map(|hosts| (key, hosts)))
        .collect()
}
