//! netmap-core: Shared types for the netmap discovery engine.
//!
//! This crate provides the data model every other netmap component works on:
//! - Host and port records produced by discovery and enrichment
//! - The address range resolver for scan targets
//! - The undirected network graph handed to renderers and reporters
//! - Common error types

pub mod error;
pub mod graph;
pub mod range;
pub mod types;

pub use error::CoreError;
pub use graph::{ConnectionKind, GraphEdge, NetworkGraph};
pub use range::AddressRange;
pub use types::{Enrichment, HostRecord, PortRecord, TransportProtocol, UNKNOWN};
