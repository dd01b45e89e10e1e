use thiserror::Error;

/// Errors raised by the netmap data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid network range {input:?}: {reason}")]
    InvalidRange { input: String, reason: String },

    #[error("Node not found in graph: {address}")]
    UnknownNode { address: String },

    #[error("Refusing to connect {address} to itself")]
    SelfLoop { address: String },

    #[error("Host {address} has already been enriched")]
    AlreadyEnriched { address: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
