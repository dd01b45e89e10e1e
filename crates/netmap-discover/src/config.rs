//! Configuration for the netmap-discover scanner.

use serde::Deserialize;

/// Top-level discover configuration.
///
/// Loaded from `netmap.toml` `[discover]` section or
/// `NETMAP_DISCOVER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Path to the nmap binary (default: "nmap").
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    /// Nmap timing template, 0 (paranoid) to 5 (insane).
    #[serde(default = "default_timing_template")]
    pub timing_template: u8,

    /// Upper bound on the whole liveness sweep.
    #[serde(default = "default_sweep_timeout")]
    pub sweep_timeout_secs: u64,

    /// Per-host budget for the deep probe, passed to nmap as `--host-timeout`.
    #[serde(default = "default_host_timeout")]
    pub host_timeout_secs: u64,

    /// Open ports kept per host. Values above 10 are clamped to 10.
    #[serde(default = "default_max_ports")]
    pub max_ports: usize,

    /// Hosts deep-probed at once. 1 keeps enrichment strictly sequential.
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,

    /// Add `-sV` to the deep probe for product/version strings.
    #[serde(default)]
    pub version_detection: bool,
}

/// Predefined scan profiles mapping to nmap flag sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProfile {
    /// Ping sweep only: `-sn`
    Sweep,
    /// TCP connect scan of the fast port list with OS detection: `-sT -F -O`
    Enrich,
}

impl ScanProfile {
    /// Return the nmap flags for this profile.
    pub fn nmap_flags(&self, config: &DiscoverConfig) -> Vec<String> {
        let timing = format!("-T{}", config.timing_template.min(5));
        match self {
            Self::Sweep => vec!["-sn".to_string(), timing],
            Self::Enrich => {
                let mut flags = vec!["-sT".to_string(), timing, "-F".to_string(), "-O".to_string()];
                if config.version_detection {
                    flags.push("-sV".to_string());
                }
                flags.push("--host-timeout".to_string());
                flags.push(format!("{}s", config.host_timeout_secs));
                flags
            }
        }
    }
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_timing_template() -> u8 {
    4
}

fn default_sweep_timeout() -> u64 {
    600
}

fn default_host_timeout() -> u64 {
    120
}

fn default_max_ports() -> usize {
    10
}

fn default_enrich_concurrency() -> usize {
    1
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            timing_template: default_timing_template(),
            sweep_timeout_secs: default_sweep_timeout(),
            host_timeout_secs: default_host_timeout(),
            max_ports: default_max_ports(),
            enrich_concurrency: default_enrich_concurrency(),
            version_detection: false,
        }
    }
}

/// Load the `[discover]` section from `<file_prefix>.toml` (optional) and the
/// environment, falling back to defaults when the section is absent.
pub fn load(file_prefix: &str) -> crate::error::Result<DiscoverConfig> {
    let cfg = ::config::Config::builder()
        .add_source(::config::File::with_name(file_prefix).required(false))
        .add_source(
            // NETMAP_DISCOVER__MAX_PORTS → discover.max_ports
            ::config::Environment::with_prefix("NETMAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| crate::error::DiscoverError::Config(e.to_string()))?;

    match cfg.get::<DiscoverConfig>("discover") {
        Ok(c) => Ok(c),
        Err(::config::ConfigError::NotFound(_)) => Ok(DiscoverConfig::default()),
        Err(e) => Err(crate::error::DiscoverError::Config(e.to_string())),
    }
}
