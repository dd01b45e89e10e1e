//! The probe-engine seam.
//!
//! Discovery and enrichment never talk to nmap directly; they go through a
//! `ProbeEngine`, so the engines can be driven by canned reports in tests.

use async_trait::async_trait;
use netmap_core::AddressRange;

use crate::error::Result;
use crate::nmap_xml::NmapRun;

/// Something that can sweep a range for live hosts and deep-probe one host.
///
/// Every call is an independent probe session: implementations must not
/// share mutable scan state between calls, so callers may run several
/// `deep_probe`s at once.
#[async_trait]
pub trait ProbeEngine: Send + Sync {
    /// Liveness sweep across `range`, without port probing.
    async fn sweep(&self, range: &AddressRange) -> Result<NmapRun>;

    /// Port, service, and OS probe of a single address.
    async fn deep_probe(&self, address: &str) -> Result<NmapRun>;
}
