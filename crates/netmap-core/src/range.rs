//! Scan target resolution.
//!
//! A range is validated up front but otherwise passed to the probe engine
//! exactly as the caller wrote it; expanding it into addresses is the probe
//! engine's job.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Serialize, Serializer};

use crate::error::{CoreError, Result};

/// A validated scan target in CIDR notation (or a single address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    text: String,
    network: IpNet,
}

impl AddressRange {
    /// Validate a caller-supplied range.
    ///
    /// Accepts `a.b.c.d/prefix` (and the IPv6 equivalent) or a bare address,
    /// which is treated as a single-host network. Empty input is an error:
    /// there is no implicit "scan the local subnet" fallback.
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();
        if text.is_empty() {
            return Err(invalid(input, "range is empty"));
        }

        let network = if text.contains('/') {
            text.parse::<IpNet>()
                .map_err(|e| invalid(input, &format!("not valid CIDR notation ({e})")))?
        } else {
            text.parse::<IpAddr>()
                .map(IpNet::from)
                .map_err(|e| invalid(input, &format!("not an IP address or CIDR ({e})")))?
        };

        Ok(Self {
            text: text.to_string(),
            network,
        })
    }

    /// The range exactly as it will be handed to the probe engine.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The parsed network.
    pub fn network(&self) -> &IpNet {
        &self.network
    }

    /// Whether `address` falls inside this range. Unparsable addresses never do.
    pub fn contains(&self, address: &str) -> bool {
        address
            .parse::<IpAddr>()
            .map(|ip| self.network.contains(&ip))
            .unwrap_or(false)
    }

    /// Number of addresses covered, saturating for very large IPv6 networks.
    pub fn address_count(&self) -> u128 {
        let host_bits = u32::from(self.network.max_prefix_len() - self.network.prefix_len());
        1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
    }
}

fn invalid(input: &str, reason: &str) -> CoreError {
    CoreError::InvalidRange {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

impl FromStr for AddressRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for AddressRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}
