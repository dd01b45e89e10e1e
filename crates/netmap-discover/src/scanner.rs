//! Nmap process wrapper.
//!
//! Executes nmap as a child process via `tokio::process::Command` and
//! parses the XML output into typed Rust structs. Each call spawns its own
//! nmap process, which is killed if the calling future is dropped.

use std::time::Instant;

use async_trait::async_trait;
use netmap_core::AddressRange;
use tokio::process::Command;

use crate::config::{DiscoverConfig, ScanProfile};
use crate::error::{DiscoverError, Result};
use crate::nmap_xml::{self, NmapRun};
use crate::probe::ProbeEngine;

/// Wrapper around the nmap binary.
pub struct NmapScanner {
    config: DiscoverConfig,
}

impl NmapScanner {
    pub fn new(config: &DiscoverConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Verify nmap is installed and accessible.
    pub async fn verify_installation(&self) -> Result<String> {
        let output = Command::new(&self.config.nmap_path)
            .arg("--version")
            .output()
            .await
            .map_err(|_| DiscoverError::NmapNotFound {
                path: self.config.nmap_path.clone(),
            })?;

        if !output.status.success() {
            return Err(DiscoverError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run nmap with `profile` against `target`, reading XML from stdout.
    pub async fn scan(&self, target: &str, profile: ScanProfile) -> Result<NmapRun> {
        let start = Instant::now();
        let flags = profile.nmap_flags(&self.config);

        tracing::debug!(target = %target, profile = ?profile, flags = ?flags, "Starting nmap");

        let output = Command::new(&self.config.nmap_path)
            .args(&flags)
            .arg("-oX")
            .arg("-")
            .arg("--noninteractive")
            .arg(target)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DiscoverError::NmapNotFound {
                path: format!("{}: {e}", self.config.nmap_path),
            })?;

        let duration = start.elapsed();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DiscoverError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let nmap_run = nmap_xml::parse_nmap_xml(&output.stdout)?;

        tracing::debug!(
            target = %target,
            profile = ?profile,
            hosts_up = nmap_run.up_hosts().count(),
            duration_ms = duration.as_millis(),
            "Nmap finished"
        );

        Ok(nmap_run)
    }
}

#[async_trait]
impl ProbeEngine for NmapScanner {
    async fn sweep(&self, range: &AddressRange) -> Result<NmapRun> {
        self.scan(range.as_str(), ScanProfile::Sweep).await
    }

    async fn deep_probe(&self, address: &str) -> Result<NmapRun> {
        self.scan(address, ScanProfile::Enrich).await
    }
}
