//! Error types for the node.

use poschain_core::RejectReason;
use poschain_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Sync or transport error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The ledger refused a block or chain.
    #[error("rejected: {0}")]
    Rejected(#[from] RejectReason),

    /// The session has stopped and no longer accepts commands.
    #[error("node stopped")]
    Stopped,

    /// The session task panicked or was aborted.
    #[error("session task failed: {0}")]
    TaskFailed(String),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
