//! # PosChain Sync
//!
//! Gossip protocol that keeps every node's chain converged on the longest
//! valid chain.
//!
//! ## Overview
//!
//! All nodes join one pub/sub topic. Every message is wrapped in an
//! [`Envelope`] naming its sender and, for targeted replies, its intended
//! receiver. Targeting is advisory: everyone receives everything and drops
//! what is not addressed to them.
//!
//! ## Key Properties
//!
//! - **Longest valid chain wins**: a received chain is adopted only if it is
//!   strictly longer and validates from genesis
//! - **Single writer**: [`SyncProtocol`] is the only code path that mutates
//!   the ledger
//! - **Silent drops**: invalid blocks and chains are logged, never answered
//!
//! ## Message Flow
//!
//! ```text
//! New node                            Peers
//!   |-------- IndexRequest (all) ----->|
//!   |<------- IndexResponse (to new) --|
//!   |-------- ChainRequest (longest) ->|
//!   |<------- ChainResponse (to new) --|
//!   |                                  |
//!   |-------- BlockAnnounce (all) ---->|
//! ```

pub mod error;
pub mod messages;
pub mod protocol;
pub mod transport;

pub use error::{Result, SyncError};
pub use messages::{Envelope, IndexPayload, MessageType, PeerId, SyncMessage};
pub use protocol::{
    BlockAccepted, BootstrapOutcome, BootstrapReport, Dispatch, SyncConfig, SyncProtocol,
};
pub use transport::{
    memory::MemoryNetwork, memory::MemoryTopic, memory::MemoryTransport, Topic, Transport,
};
