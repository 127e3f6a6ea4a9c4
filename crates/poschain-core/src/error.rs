//! Error types for PosChain core.

use thiserror::Error;

/// Errors decoding core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid block hash: {0}")]
    InvalidHash(String),
}

/// Why a block or a candidate chain was not accepted.
///
/// Single-block rejections (`StaleIndex`, `BrokenLinkage`, `HashMismatch`)
/// come from [`check_successor`](crate::validation::check_successor);
/// whole-chain rejections (`NotLonger`, `InvalidChain`) from chain adoption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("stale index: expected {expected}, got {got}")]
    StaleIndex { expected: u64, got: u64 },

    #[error("block {index} does not link to the current head")]
    BrokenLinkage { index: u64 },

    #[error("block {index} hash does not match its contents")]
    HashMismatch { index: u64 },

    #[error("candidate chain is not longer: local={local}, candidate={candidate}")]
    NotLonger { local: usize, candidate: usize },

    #[error("candidate chain invalid at position {position}: {reason}")]
    InvalidChain { position: usize, reason: String },
}

impl RejectReason {
    /// Whether this rejection concerns a single announced block.
    pub fn is_block_reject(&self) -> bool {
        matches!(
            self,
            RejectReason::StaleIndex { .. }
                | RejectReason::BrokenLinkage { .. }
                | RejectReason::HashMismatch { .. }
        )
    }
}
