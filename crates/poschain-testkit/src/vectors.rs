//! Golden hash vectors.
//!
//! A fixed four-block chain with its expected digests. Any node that hashes
//! differently cannot interoperate on the topic.

use poschain_core::{Block, Transaction};

/// One block of the golden chain.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub card_id: i64,
    pub amount: i64,
    pub signer_id: &'static str,
    /// Expected block hash (hex).
    pub expected_hash: &'static str,
}

/// The golden chain, genesis first.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "genesis",
            card_id: 0,
            amount: 0,
            signer_id: "0",
            expected_hash: "aa3dcca5181c5026c6b3493ae17745be158a9f713b4b435897788e2e531398e3",
        },
        GoldenVector {
            name: "first sale",
            card_id: 7,
            amount: 50,
            signer_id: "pos",
            expected_hash: "a229f2a0df1b3cf0fbd9a39a1c026ce4bbc6c295e35410c88d3853f09f0a7f46",
        },
        GoldenVector {
            name: "refund",
            card_id: 7,
            amount: -20,
            signer_id: "pos",
            expected_hash: "4d038af3ef7dae4f1e3fe7db4d75fd88df5c37f2031fc4123f5e27f39a4e4e05",
        },
        GoldenVector {
            name: "second terminal",
            card_id: 12,
            amount: 300,
            signer_id: "store-2",
            expected_hash: "7dcf85e23f59339a94551f8ad1405a3b2cf0ffd152e2cd969d14ea78af3af66e",
        },
    ]
}

/// Build the golden chain from its vectors.
///
/// The timestamps differ per block to show they do not enter the hash.
pub fn golden_chain() -> Vec<Block> {
    let mut chain = vec![Block::genesis()];
    for (i, vector) in all_vectors().iter().enumerate().skip(1) {
        let tx = Transaction::new(vector.card_id, vector.amount, vector.signer_id);
        let next = Block::successor(&chain[i - 1], tx, format!("{}", 1_700_000_000_000u64 + i as u64));
        chain.push(next);
    }
    chain
}

/// Check each golden block against its expected hash.
///
/// Returns `(name, passed, actual_hash)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    golden_chain()
        .iter()
        .zip(all_vectors())
        .map(|(block, vector)| {
            let actual = block.hash.to_hex();
            (vector.name.to_string(), actual == vector.expected_hash, actual)
        })
        .collect()
}
