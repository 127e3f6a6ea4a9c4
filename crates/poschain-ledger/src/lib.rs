//! # PosChain Ledger
//!
//! The owned chain and its derived card balances.
//!
//! A [`Ledger`] is a plain value: it has no interior locking. The node keeps
//! exactly one of them inside its dispatch task, which makes that task the
//! only writer and serializes every append and replace.
//!
//! ## Invariants
//!
//! - The chain always starts with the genesis block
//! - Every adjacent pair of blocks is linked and correctly hashed
//! - [`BalanceIndex`] equals the fold of the chain after every mutation
//! - A rejected mutation leaves chain and balances untouched

pub mod balance;
pub mod ledger;

pub use balance::BalanceIndex;
pub use ledger::Ledger;
pub use poschain_core::RejectReason;
