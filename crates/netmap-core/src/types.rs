//! Core domain types for a netmap discovery run.
//!
//! A run produces one `HostRecord` per live host. Discovery creates the
//! record; enrichment fills in ports and OS exactly once afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Placeholder for any attribute the probe engine could not determine.
pub const UNKNOWN: &str = "unknown";

// ── Ports ─────────────────────────────────────────────────────────

/// Transport layer a port was found on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    Tcp,
    Udp,
    Sctp,
    Other(String),
}

impl TransportProtocol {
    /// Map a probe-engine protocol label onto a known transport.
    pub fn parse(proto: &str) -> Self {
        match proto.to_lowercase().as_str() {
            "tcp" => Self::Tcp,
            "udp" => Self::Udp,
            "sctp" => Self::Sctp,
            _ => Self::Other(proto.to_string()),
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
            Self::Sctp => f.write_str("sctp"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// An open port discovered on a host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortRecord {
    pub port_number: u16,
    pub transport_protocol: TransportProtocol,
    /// Service name, optionally annotated as `"name (product version)"`.
    pub service_description: String,
}

impl PortRecord {
    pub fn new(
        port_number: u16,
        transport_protocol: TransportProtocol,
        service_description: impl Into<String>,
    ) -> Self {
        Self {
            port_number,
            transport_protocol,
            service_description: service_description.into(),
        }
    }
}

// ── Enrichment ────────────────────────────────────────────────────

/// Result of the deep per-host probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enrichment {
    pub ports: Vec<PortRecord>,
    pub os: String,
}

impl Enrichment {
    /// The value a host falls back to when its deep probe fails.
    pub fn unknown() -> Self {
        Self {
            ports: Vec::new(),
            os: UNKNOWN.to_string(),
        }
    }
}

impl Default for Enrichment {
    fn default() -> Self {
        Self::unknown()
    }
}

// ── Hosts ─────────────────────────────────────────────────────────

/// One live host found during a discovery run.
///
/// `address` is the unique key for the run and cannot change after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostRecord {
    address: String,
    pub hardware_address: String,
    pub vendor: String,
    pub display_name: String,
    pub operating_system: String,
    pub open_ports: Vec<PortRecord>,
    #[serde(default)]
    enriched: bool,
}

impl HostRecord {
    /// Build a freshly discovered host.
    ///
    /// Missing identity fields collapse to `"unknown"`; a missing or blank
    /// hostname falls back to the address itself.
    pub fn discovered(
        address: impl Into<String>,
        hardware_address: Option<&str>,
        vendor: Option<&str>,
        hostname: Option<&str>,
    ) -> Self {
        let address = address.into();
        let display_name = hostname
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .unwrap_or_else(|| address.clone());

        Self {
            display_name,
            hardware_address: non_empty_or_unknown(hardware_address),
            vendor: non_empty_or_unknown(vendor),
            operating_system: UNKNOWN.to_string(),
            open_ports: Vec::new(),
            enriched: false,
            address,
        }
    }

    /// The host's address. Fixed for the life of the record.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether a deep-probe result has been applied.
    pub fn is_enriched(&self) -> bool {
        self.enriched
    }

    /// Whether the sweep reported a MAC address.
    pub fn has_hardware_address(&self) -> bool {
        self.hardware_address != UNKNOWN
    }

    /// Record the deep-probe result. Allowed once per record.
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) -> Result<()> {
        if self.enriched {
            return Err(CoreError::AlreadyEnriched {
                address: self.address.clone(),
            });
        }

        self.open_ports = enrichment.ports;
        self.operating_system = enrichment.os;
        self.enriched = true;
        Ok(())
    }
}

fn non_empty_or_unknown(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovered_host_defaults() {
        let host = HostRecord::discovered("192.168.1.10", None, None, None);
        assert_eq!(host.address(), "192.168.1.10");
        assert_eq!(host.display_name, "192.168.1.10");
        assert_eq!(host.hardware_address, UNKNOWN);
        assert_eq!(host.vendor, UNKNOWN);
        assert_eq!(host.operating_system, UNKNOWN);
        assert!(host.open_ports.is_empty());
        assert!(!host.is_enriched());
        assert!(!host.has_hardware_address());
    }

    #[test]
    fn test_blank_hostname_falls_back_to_address() {
        let host = HostRecord::discovered("10.0.0.7", Some("AA:BB:CC:00:11:22"), None, Some("  "));
        assert_eq!(host.display_name, "10.0.0.7");
        assert_eq!(host.hardware_address, "AA:BB:CC:00:11:22");
        assert_eq!(host.vendor, UNKNOWN);
    }

    #[test]
    fn test_apply_enrichment_once() {
        let mut host = HostRecord::discovered("10.0.0.7", None, None, Some("nas.local"));
        let enrichment = Enrichment {
            ports: vec![PortRecord::new(445, TransportProtocol::Tcp, "microsoft-ds")],
            os: "Linux 5.x (92%)".to_string(),
        };

        host.apply_enrichment(enrichment.clone()).unwrap();
        assert_eq!(host.operating_system, "Linux 5.x (92%)");
        assert_eq!(host.open_ports.len(), 1);

        let err = host.apply_enrichment(Enrichment::unknown()).unwrap_err();
        assert_eq!(
            err,
            CoreError::AlreadyEnriched {
                address: "10.0.0.7".to_string()
            }
        );
        // The first result is left untouched.
        assert_eq!(host.operating_system, "Linux 5.x (92%)");
    }

    #[test]
    fn test_transport_protocol_parse() {
        assert_eq!(TransportProtocol::parse("tcp"), TransportProtocol::Tcp);
        assert_eq!(TransportProtocol::parse("UDP"), TransportProtocol::Udp);
        assert_eq!(TransportProtocol::parse("sctp"), TransportProtocol::Sctp);
        assert_eq!(
            TransportProtocol::parse("ip"),
            TransportProtocol::Other("ip".to_string())
        );
        assert_eq!(TransportProtocol::Udp.to_string(), "udp");
    }

    #[test]
    fn test_host_serializes_address() {
        let host = HostRecord::discovered("10.0.0.1", None, None, Some("gw"));
        let json = serde_json::to_value(&host).unwrap();
        assert_eq!(json["address"], "10.0.0.1");
        assert_eq!(json["display_name"], "gw");
    }
}
