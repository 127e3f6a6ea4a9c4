//! Error types for the sync module.

use thiserror::Error;

use poschain_core::RejectReason;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Received bytes or payload failed to decode.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Outgoing message failed to serialize.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Transport-level error (join, publish, peer listing).
    #[error("transport error: {0}")]
    Transport(String),

    /// The topic subscription ended.
    #[error("transport closed")]
    TransportClosed,

    /// The ledger refused a block or chain.
    #[error("rejected: {0}")]
    Rejected(#[from] RejectReason),
}

impl SyncError {
    /// Whether this error means the node can no longer talk to its peers.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::TransportClosed)
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
