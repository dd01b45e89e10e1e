//! Per-host enrichment: open ports, services, and an OS guess.
//!
//! Failures never leave this module through `enrich`; a host whose deep
//! probe errors out or overruns its budget simply ends up with
//! `Enrichment::unknown()`.

use std::sync::Arc;
use std::time::Duration;

use netmap_core::{Enrichment, PortRecord, TransportProtocol, UNKNOWN};

use crate::error::{DiscoverError, Result};
use crate::nmap_xml::{NmapPort, NmapRun};
use crate::probe::ProbeEngine;

/// Hard ceiling on open ports kept per host, whatever the configuration says.
pub const MAX_OPEN_PORTS: usize = 10;

/// Slack on top of nmap's own `--host-timeout` before the process is killed.
const TIMEOUT_GRACE: Duration = Duration::from_secs(30);

/// Deep-probes one host at a time. Cheap to clone; clones share the probe.
#[derive(Clone)]
pub struct EnrichmentEngine {
    probe: Arc<dyn ProbeEngine>,
    host_timeout: Duration,
    max_ports: usize,
}

impl EnrichmentEngine {
    /// `max_ports` is clamped to [`MAX_OPEN_PORTS`].
    pub fn new(probe: Arc<dyn ProbeEngine>, host_timeout: Duration, max_ports: usize) -> Self {
        if max_ports > MAX_OPEN_PORTS {
            tracing::warn!(
                requested = max_ports,
                limit = MAX_OPEN_PORTS,
                "max_ports above limit, clamping"
            );
        }
        Self {
            probe,
            host_timeout,
            max_ports: max_ports.min(MAX_OPEN_PORTS),
        }
    }

    /// Enrich `address`, falling back to "unknown" on any failure.
    pub async fn enrich(&self, address: &str) -> Enrichment {
        match self.try_enrich(address).await {
            Ok(enrichment) => {
                tracing::info!(
                    address = %address,
                    open_ports = enrichment.ports.len(),
                    os = %enrichment.os,
                    "Host enriched"
                );
                enrichment
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Host enrichment failed");
                Enrichment::unknown()
            }
        }
    }

    /// Enrich `address`, surfacing failures as `DiscoverError::HostEnrichment`.
    pub async fn try_enrich(&self, address: &str) -> Result<Enrichment> {
        let deadline = self.host_timeout + TIMEOUT_GRACE;
        let report = tokio::time::timeout(deadline, self.probe.deep_probe(address))
            .await
            .map_err(|_| DiscoverError::Timeout {
                seconds: deadline.as_secs(),
            })
            .and_then(|r| r)
            .map_err(|e| DiscoverError::HostEnrichment {
                address: address.to_string(),
                source: Box::new(e),
            })?;

        Ok(enrichment_from_report(&report, address, self.max_ports))
    }
}

/// Extract ports and OS for `address` from a deep-probe report.
///
/// Keeps the first `max_ports` open ports in report order, never more than
/// [`MAX_OPEN_PORTS`]. A report that does
/// not mention the host yields the unknown enrichment.
pub fn enrichment_from_report(report: &NmapRun, address: &str, max_ports: usize) -> Enrichment {
    let Some(host) = report.host(address) else {
        tracing::debug!(address = %address, "Host missing from deep-probe report");
        return Enrichment::unknown();
    };

    let os = host
        .best_os()
        .map(|m| match m.accuracy.as_deref() {
            Some(accuracy) => format!("{} ({accuracy}%)", m.name),
            None => m.name.clone(),
        })
        .unwrap_or_else(|| UNKNOWN.to_string());

    let ports = host
        .open_ports()
        .take(max_ports.min(MAX_OPEN_PORTS))
        .map(port_record)
        .collect();

    Enrichment { ports, os }
}

fn port_record(port: &NmapPort) -> PortRecord {
    let service = port.service.as_ref();
    let description = describe_service(
        service.and_then(|s| s.name.as_deref()),
        service.and_then(|s| s.product.as_deref()),
        service.and_then(|s| s.version.as_deref()),
    );
    PortRecord::new(
        port.port_id,
        TransportProtocol::parse(&port.protocol),
        description,
    )
}

/// `name`, `name (product)`, or `name (product version)`.
pub fn describe_service(name: Option<&str>, product: Option<&str>, version: Option<&str>) -> String {
    let name = name.filter(|n| !n.is_empty()).unwrap_or(UNKNOWN);
    let product = product.filter(|p| !p.is_empty());
    let version = version.filter(|v| !v.is_empty());

    match (product, version) {
        (Some(p), Some(v)) => format!("{name} ({p} {v})"),
        (Some(p), None) => format!("{name} ({p})"),
        // A version without a product says nothing useful on its own.
        (None, _) => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmap_xml::parse_nmap_xml;

    fn report_with_ports(address: &str, count: u16) -> NmapRun {
        let ports: String = (1..=count)
            .map(|i| {
                format!(
                    r#"<port protocol="tcp" portid="{}"><state state="open"/><service name="svc{i}"/></port>"#,
                    1000 + i
                )
            })
            .collect();
        let xml = format!(
            r#"<nmaprun><host><status state="up"/><address addr="{address}" addrtype="ipv4"/><ports>{ports}</ports></host></nmaprun>"#
        );
        parse_nmap_xml(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_describe_service() {
        assert_eq!(describe_service(Some("http"), Some("nginx"), Some("1.18")), "http (nginx 1.18)");
        assert_eq!(describe_service(Some("http"), Some("nginx"), None), "http (nginx)");
        assert_eq!(describe_service(Some("http"), Some("nginx"), Some("")), "http (nginx)");
        assert_eq!(describe_service(Some("ssh"), None, Some("9.6")), "ssh");
        assert_eq!(describe_service(Some("ssh"), Some(""), None), "ssh");
        assert_eq!(describe_service(None, None, None), "unknown");
    }

    #[test]
    fn test_os_and_ports_from_report() {
        let xml = r#"<nmaprun>
  <host>
    <status state="up"/>
    <address addr="192.168.1.10" addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="80"><state state="open"/><service name="http" product="nginx" version="1.18"/></port>
      <port protocol="tcp" portid="22"><state state="open"/><service name="ssh"/></port>
      <port protocol="tcp" portid="25"><state state="closed"/><service name="smtp"/></port>
      <port protocol="udp" portid="53"><state state="open"/></port>
    </ports>
    <os>
      <osmatch name="Linux 5.x" accuracy="92"/>
      <osmatch name="Linux 4.x" accuracy="85"/>
    </os>
  </host>
</nmaprun>"#;
        let report = parse_nmap_xml(xml.as_bytes()).unwrap();
        let enrichment = enrichment_from_report(&report, "192.168.1.10", 10);

        assert_eq!(enrichment.os, "Linux 5.x (92%)");
        assert_eq!(
            enrichment.ports,
            vec![
                PortRecord::new(80, TransportProtocol::Tcp, "http (nginx 1.18)"),
                PortRecord::new(22, TransportProtocol::Tcp, "ssh"),
                PortRecord::new(53, TransportProtocol::Udp, "unknown"),
            ]
        );
    }

    #[test]
    fn test_os_without_accuracy() {
        let xml = r#"<nmaprun><host><status state="up"/><address addr="10.0.0.2" addrtype="ipv4"/>
<os><osmatch name="OpenBSD 7.4"/></os></host></nmaprun>"#;
        let report = parse_nmap_xml(xml.as_bytes()).unwrap();
        assert_eq!(enrichment_from_report(&report, "10.0.0.2", 10).os, "OpenBSD 7.4");
    }

    #[test]
    fn test_ports_truncated_to_prefix() {
        let report = report_with_ports("10.0.0.5", 25);
        let enrichment = enrichment_from_report(&report, "10.0.0.5", 10);

        let numbers: Vec<u16> = enrichment.ports.iter().map(|p| p.port_number).collect();
        let expected: Vec<u16> = (1001..=1010).collect();
        assert_eq!(numbers, expected);
        assert_eq!(enrichment.os, UNKNOWN);
    }

    #[test]
    fn test_port_limit_cannot_be_raised() {
        let report = report_with_ports("10.0.0.5", 25);
        assert_eq!(
            enrichment_from_report(&report, "10.0.0.5", 50).ports.len(),
            MAX_OPEN_PORTS
        );
    }

    struct CannedProbe(NmapRun);

    #[async_trait::async_trait]
    impl ProbeEngine for CannedProbe {
        async fn sweep(&self, _range: &netmap_core::AddressRange) -> Result<NmapRun> {
            Ok(self.0.clone())
        }

        async fn deep_probe(&self, _address: &str) -> Result<NmapRun> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_engine_clamps_configured_max_ports() {
        let probe = Arc::new(CannedProbe(report_with_ports("10.0.0.5", 25)));
        let engine = EnrichmentEngine::new(probe, Duration::from_secs(5), 50);

        let enrichment = engine.enrich("10.0.0.5").await;
        let numbers: Vec<u16> = enrichment.ports.iter().map(|p| p.port_number).collect();
        assert_eq!(numbers, (1001..=1010).collect::<Vec<u16>>());
    }

    #[test]
    fn test_fewer_ports_than_limit_kept_whole() {
        let report = report_with_ports("10.0.0.5", 3);
        assert_eq!(enrichment_from_report(&report, "10.0.0.5", 10).ports.len(), 3);
    }

    #[test]
    fn test_missing_host_is_unknown() {
        let report = report_with_ports("10.0.0.5", 3);
        assert_eq!(
            enrichment_from_report(&report, "10.0.0.6", 10),
            Enrichment::unknown()
        );
    }
}
