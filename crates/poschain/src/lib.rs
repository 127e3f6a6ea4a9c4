//! # PosChain
//!
//! A replicated point-of-sale ledger: every node keeps the full hash chain
//! of card transactions and converges on the longest valid chain over a
//! gossip topic.
//!
//! ## Overview
//!
//! - **Blocks**: one card transaction each, linked by SHA-256 hashes
//! - **Ledger**: the chain plus per-card balances
//! - **Sync**: index/chain exchange on join, block announcements afterwards
//! - **Node**: one task per node serializing every ledger mutation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use poschain::{NodeConfig, NodeSession};
//! use poschain::core::Transaction;
//! use poschain::sync::{MemoryNetwork, PeerId};
//!
//! async fn example() -> poschain::Result<()> {
//!     let network = MemoryNetwork::new();
//!     let transport = network.transport(PeerId::random());
//!
//!     let (node, mut events) = NodeSession::start(&transport, NodeConfig::default()).await?;
//!
//!     node.publish(Transaction::new(7, 50, "till-1")).await?;
//!     println!("card 7: {}", node.balance_of(7).await?);
//!
//!     while let Some(accepted) = events.recv().await {
//!         println!("{} from {}", accepted.transaction, accepted.sender_id.short());
//!     }
//!     node.shutdown().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `poschain::core` - Blocks, hashes, validation
//! - `poschain::ledger` - Chain plus balance index
//! - `poschain::sync` - Gossip protocol and transports

pub mod config;
pub mod error;
pub mod node;

// Re-export component crates
pub use poschain_core as core;
pub use poschain_ledger as ledger;
pub use poschain_sync as sync;

// Re-export main types for convenience
pub use config::{NodeConfig, DEFAULT_TOPIC};
pub use error::{NodeError, Result};
pub use node::{NodeHandle, NodeSession, NodeState};

// Re-export commonly used types
pub use poschain_core::{Block, BlockHash, CardId, RejectReason, Transaction};
pub use poschain_ledger::Ledger;
pub use poschain_sync::{BlockAccepted, PeerId, SyncConfig};
