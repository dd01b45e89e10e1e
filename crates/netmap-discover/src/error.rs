//! Error types for the netmap-discover crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Nmap not found at path: {path}")]
    NmapNotFound { path: String },

    #[error("Nmap exited with code {code}: {stderr}")]
    NmapFailed { code: i32, stderr: String },

    #[error("Failed to parse nmap XML output: {0}")]
    XmlParse(String),

    #[error("Probe timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Enrichment of {address} failed: {source}")]
    HostEnrichment {
        address: String,
        #[source]
        source: Box<DiscoverError>,
    },

    #[error(transparent)]
    Core(#[from] netmap_core::CoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoverError {
    /// Whether this error came from the probe engine rather than from input
    /// validation or local I/O.
    pub fn is_probe_failure(&self) -> bool {
        matches!(
            self,
            Self::NmapNotFound { .. }
                | Self::NmapFailed { .. }
                | Self::XmlParse(_)
                | Self::Timeout { .. }
                | Self::HostEnrichment { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
