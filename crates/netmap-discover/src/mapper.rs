//! Run orchestration: range → discovery → enrichment → topology.
//!
//! `NetworkMapper` owns the graph for the duration of a run. Engines only
//! return data; results are merged here, one host at a time, after each
//! host's probe completes. An interrupt stops the current phase and keeps
//! everything committed so far.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use netmap_core::{AddressRange, HostRecord, NetworkGraph};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::DiscoverConfig;
use crate::discovery::DiscoveryEngine;
use crate::enrichment::EnrichmentEngine;
use crate::error::Result;
use crate::probe::ProbeEngine;
use crate::topology;

/// Everything one run produced, as handed to renderers and reporters.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkMap {
    pub run_id: Uuid,
    pub range: AddressRange,
    /// Whether enrichment was requested, i.e. whether OS/port fields mean anything.
    pub scan_ports: bool,
    pub hosts: Vec<HostRecord>,
    pub graph: NetworkGraph,
    pub edge_count: usize,
    pub gateway: Option<String>,
    /// The run was stopped early; `hosts` holds what finished before that.
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Drives a full discovery run against a probe engine.
pub struct NetworkMapper {
    config: DiscoverConfig,
    discovery: DiscoveryEngine,
    enrichment: EnrichmentEngine,
}

impl NetworkMapper {
    pub fn new(config: DiscoverConfig, probe: Arc<dyn ProbeEngine>) -> Self {
        let discovery = DiscoveryEngine::new(
            probe.clone(),
            Duration::from_secs(config.sweep_timeout_secs),
        );
        let enrichment = EnrichmentEngine::new(
            probe,
            Duration::from_secs(config.host_timeout_secs),
            config.max_ports,
        );
        Self {
            config,
            discovery,
            enrichment,
        }
    }

    /// Map `range`. Only an invalid range is reported as an error; probe
    /// failures degrade to empty or "unknown" results.
    ///
    /// Setting `shutdown` to `true` stops the run gracefully.
    pub async fn map(
        &self,
        range: &str,
        scan_ports: bool,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<NetworkMap> {
        let range = AddressRange::parse(range)?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!(run_id = %run_id, range = %range, scan_ports, "Starting network map");

        let mut interrupted = false;
        let mut hosts = tokio::select! {
            hosts = self.discovery.discover(&range) => hosts,
            _ = wait_for_shutdown(&mut shutdown) => {
                tracing::warn!(run_id = %run_id, "Interrupted during discovery");
                interrupted = true;
                Vec::new()
            }
        };

        if hosts.is_empty() && !interrupted {
            tracing::info!(run_id = %run_id, range = %range, "No live hosts found");
        }

        let mut graph = NetworkGraph::from_hosts(&hosts);

        if scan_ports && !interrupted && !hosts.is_empty() {
            interrupted = self.enrich_all(&mut hosts, &mut graph, &mut shutdown).await;
        }

        let edge_count = topology::infer_topology(&hosts, &mut graph);
        let gateway = topology::select_gateway(&hosts)
            .filter(|g| graph.contains(g.address()))
            .map(|g| g.address().to_string());

        let duration_ms = saturating_millis(start.elapsed());
        tracing::info!(
            run_id = %run_id,
            range = %range,
            hosts = hosts.len(),
            edges = edge_count,
            interrupted,
            duration_ms,
            "Network map complete"
        );

        Ok(NetworkMap {
            run_id,
            range,
            scan_ports,
            hosts,
            graph,
            edge_count,
            gateway,
            interrupted,
            started_at,
            duration_ms,
        })
    }

    /// Deep-probe every host with at most `enrich_concurrency` probes in
    /// flight. Returns `true` if interrupted.
    async fn enrich_all(
        &self,
        hosts: &mut [HostRecord],
        graph: &mut NetworkGraph,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let limit = self.config.enrich_concurrency.max(1);
        let mut pending: VecDeque<(usize, String)> = hosts
            .iter()
            .enumerate()
            .map(|(i, h)| (i, h.address().to_string()))
            .collect();
        let mut in_flight = JoinSet::new();

        tracing::info!(hosts = pending.len(), concurrency = limit, "Enriching hosts");

        loop {
            while in_flight.len() < limit {
                let Some((idx, address)) = pending.pop_front() else {
                    break;
                };
                let engine = self.enrichment.clone();
                in_flight.spawn(async move {
                    let enrichment = engine.enrich(&address).await;
                    (idx, enrichment)
                });
            }

            if in_flight.is_empty() {
                return false;
            }

            tokio::select! {
                joined = in_flight.join_next() => match joined {
                    Some(Ok((idx, enrichment))) => {
                        let host = &mut hosts[idx];
                        if let Err(e) = graph.apply_enrichment(host.address(), enrichment.clone()) {
                            tracing::warn!(address = %host.address(), error = %e, "Graph node not updated");
                        }
                        if let Err(e) = host.apply_enrichment(enrichment) {
                            tracing::warn!(address = %host.address(), error = %e, "Host record not updated");
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Enrichment task failed; host keeps unknown fields");
                    }
                    None => return false,
                },
                _ = wait_for_shutdown(shutdown) => {
                    tracing::warn!(
                        in_flight = in_flight.len(),
                        not_started = pending.len(),
                        "Interrupted during enrichment"
                    );
                    in_flight.abort_all();
                    return true;
                }
            }
        }
    }
}

fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Resolve once `shutdown` reads `true`. Never resolves if the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
