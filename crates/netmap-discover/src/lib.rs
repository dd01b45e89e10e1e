//! netmap-discover: Host discovery and topology inference for netmap.
//!
//! Wraps nmap to sweep a range for live hosts, optionally deep-probes each
//! host for ports and OS, and infers a star topology around a heuristically
//! chosen gateway. The resulting `NetworkMap` feeds the text report and the
//! DOT/JSON exporters.

pub mod config;
pub mod discovery;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod mapper;
pub mod nmap_xml;
pub mod probe;
pub mod report;
pub mod scanner;
pub mod topology;

pub use error::DiscoverError;
pub use mapper::{NetworkMap, NetworkMapper};
