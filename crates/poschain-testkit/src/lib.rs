//! # PosChain Testkit
//!
//! Testing utilities for PosChain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: A fixed chain with known digests for cross-node verification
//! - **Generators**: Proptest strategies for transactions, chains and tampering
//! - **Fixtures**: Chain and ledger builders for integration tests
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use poschain_testkit::generators::chain;
//!
//! proptest! {
//!     #[test]
//!     fn generated_chains_validate(blocks in chain(20)) {
//!         prop_assert!(poschain_core::validate_chain(&blocks).is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use poschain_testkit::fixtures::{corrupt_hash, chain_of_length};
//!
//! let mut chain = chain_of_length(6, 1);
//! corrupt_hash(&mut chain, 3);
//! assert!(poschain_core::validate_chain(&chain).is_err());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    chain_of_length, chain_with, corrupt_hash, expected_balance, ledger_of_length,
    sale_transactions, tamper_amount,
};
pub use generators::{Tamper, TamperKind};
pub use vectors::{all_vectors, golden_chain, verify_all_vectors, GoldenVector};
