//! Host discovery: liveness sweep → `HostRecord`s.
//!
//! Discovery is best-effort. A probe-engine failure or a sweep that overruns
//! its deadline is logged and reported as "no hosts found"; nothing past
//! range validation ever reaches the caller as an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use netmap_core::{AddressRange, HostRecord};

use crate::nmap_xml::{NmapHost, NmapRun};
use crate::probe::ProbeEngine;

/// Runs the liveness sweep and builds the initial host registry.
pub struct DiscoveryEngine {
    probe: Arc<dyn ProbeEngine>,
    sweep_timeout: Duration,
}

impl DiscoveryEngine {
    pub fn new(probe: Arc<dyn ProbeEngine>, sweep_timeout: Duration) -> Self {
        Self {
            probe,
            sweep_timeout,
        }
    }

    /// Sweep `range` and return one record per live host, in report order.
    pub async fn discover(&self, range: &AddressRange) -> Vec<HostRecord> {
        let start = Instant::now();
        tracing::info!(
            range = %range,
            addresses = range.address_count(),
            "Starting liveness sweep"
        );

        let report = match tokio::time::timeout(self.sweep_timeout, self.probe.sweep(range)).await
        {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                tracing::warn!(range = %range, error = %e, "Liveness sweep failed; no hosts discovered");
                return Vec::new();
            }
            Err(_) => {
                tracing::warn!(
                    range = %range,
                    timeout_secs = self.sweep_timeout.as_secs(),
                    "Liveness sweep timed out; no hosts discovered"
                );
                return Vec::new();
            }
        };

        let hosts = hosts_from_sweep(&report, range);
        tracing::info!(
            range = %range,
            hosts_up = hosts.len(),
            duration_ms = start.elapsed().as_millis(),
            "Liveness sweep complete"
        );
        hosts
    }
}

/// Convert a sweep report into host records.
///
/// Only hosts that are up, have an address, and lie inside `range` are kept;
/// a repeated address keeps its first occurrence.
pub fn hosts_from_sweep(report: &NmapRun, range: &AddressRange) -> Vec<HostRecord> {
    let mut seen = HashSet::new();
    report
        .up_hosts()
        .filter_map(|h| convert_nmap_host(h, range))
        .filter(|h| seen.insert(h.address().to_string()))
        .collect()
}

fn convert_nmap_host(nmap_host: &NmapHost, range: &AddressRange) -> Option<HostRecord> {
    let Some(ip) = nmap_host.ip() else {
        tracing::debug!("Skipping live host without an IP address");
        return None;
    };

    if !range.contains(ip) {
        tracing::warn!(address = %ip, range = %range, "Probe reported a host outside the range");
        return None;
    }

    // A vendor only means something alongside the MAC it was derived from.
    let mac = nmap_host.mac();
    let vendor = mac.and(nmap_host.vendor());

    Some(HostRecord::discovered(ip, mac, vendor, nmap_host.hostname()))
}
