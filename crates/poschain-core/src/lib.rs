//! # PosChain Core
//!
//! Pure primitives for PosChain: transactions, blocks, hashing, and chain
//! validation.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Transaction`] - A balance delta on a card
//! - [`Block`] - One transaction linked to its predecessor by hash
//! - [`BlockHash`] - SHA-256 digest, hex on the wire
//! - [`RejectReason`] - Why a block or chain was refused
//!
//! ## Hashing
//!
//! `hash = SHA-256(index ∥ prevHash ∥ transaction.canonical_string())`.
//! The timestamp is deliberately left out of the digest.

pub mod block;
pub mod crypto;
pub mod error;
pub mod transaction;
pub mod types;
pub mod validation;

pub use block::{compute_hash, dump_chain, Block, GENESIS_TIMESTAMP};
pub use crypto::BlockHash;
pub use error::{CoreError, RejectReason};
pub use transaction::Transaction;
pub use types::CardId;
pub use validation::{check_successor, is_valid_successor, validate_chain};
