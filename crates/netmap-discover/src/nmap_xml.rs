//! Nmap XML report model.
//!
//! Both probe kinds are read from nmap's `-oX -` output. Only the parts the
//! discovery and enrichment engines consume are modelled; everything else in
//! the document is skipped by the deserializer.

use serde::Deserialize;

use crate::error::{DiscoverError, Result};

/// Root element: `<nmaprun>`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "nmaprun")]
pub struct NmapRun {
    #[serde(rename = "@args")]
    pub args: Option<String>,
    #[serde(rename = "host", default)]
    pub hosts: Vec<NmapHost>,
    pub runstats: Option<RunStats>,
}

/// A single host from scan results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NmapHost {
    pub status: Option<HostStatus>,
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub hostnames: Option<Hostnames>,
    pub ports: Option<Ports>,
    pub os: Option<OsMatches>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostStatus {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: String,
    #[serde(rename = "@addrtype")]
    pub addr_type: String,
    #[serde(rename = "@vendor")]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostnames {
    #[serde(rename = "hostname", default)]
    pub hostnames: Vec<Hostname>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostname {
    #[serde(rename = "@name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<NmapPort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapPort {
    #[serde(rename = "@protocol")]
    pub protocol: String,
    #[serde(rename = "@portid")]
    pub port_id: u16,
    pub state: PortState,
    pub service: Option<NmapService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortState {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapService {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "@product")]
    pub product: Option<String>,
    #[serde(rename = "@version")]
    pub version: Option<String>,
}

/// OS guesses, ordered by nmap from most to least accurate.
#[derive(Debug, Clone, Deserialize)]
pub struct OsMatches {
    #[serde(rename = "osmatch", default)]
    pub matches: Vec<OsMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsMatch {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@accuracy")]
    pub accuracy: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStats {
    pub hosts: Option<RunStatsHosts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStatsHosts {
    #[serde(rename = "@up")]
    pub up: Option<String>,
    #[serde(rename = "@total")]
    pub total: Option<String>,
}

impl NmapRun {
    /// Find a host by any of its addresses.
    pub fn host(&self, address: &str) -> Option<&NmapHost> {
        self.hosts
            .iter()
            .find(|h| h.addresses.iter().any(|a| a.addr == address))
    }

    /// Hosts nmap reported as up.
    pub fn up_hosts(&self) -> impl Iterator<Item = &NmapHost> {
        self.hosts.iter().filter(|h| h.is_up())
    }
}

impl NmapHost {
    /// The host's IP address, preferring IPv4.
    pub fn ip(&self) -> Option<&str> {
        self.address_of("ipv4").or_else(|| self.address_of("ipv6"))
    }

    /// Extract the MAC address, if present.
    pub fn mac(&self) -> Option<&str> {
        self.address_of("mac")
    }

    /// Vendor nmap attached to the MAC address.
    pub fn vendor(&self) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.addr_type == "mac")
            .and_then(|a| a.vendor.as_deref())
    }

    /// Extract the first non-empty hostname, if present.
    pub fn hostname(&self) -> Option<&str> {
        self.hostnames
            .as_ref()?
            .hostnames
            .iter()
            .map(|h| h.name.as_str())
            .find(|name| !name.is_empty())
    }

    /// Check if the host is up.
    pub fn is_up(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.state == "up")
    }

    /// The highest-accuracy OS match (nmap lists it first).
    pub fn best_os(&self) -> Option<&OsMatch> {
        self.os.as_ref().and_then(|os| os.matches.first())
    }

    /// Ports in state `open`, in report order.
    pub fn open_ports(&self) -> impl Iterator<Item = &NmapPort> {
        self.ports
            .iter()
            .flat_map(|p| p.ports.iter())
            .filter(|p| p.state.state == "open")
    }

    fn address_of(&self, addr_type: &str) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.addr_type == addr_type)
            .map(|a| a.addr.as_str())
    }
}

/// Parse nmap XML bytes into a structured `NmapRun`.
pub fn parse_nmap_xml(xml: &[u8]) -> Result<NmapRun> {
    quick_xml::de::from_reader(xml).map_err(|e| DiscoverError::XmlParse(format!("{e}")))
}
