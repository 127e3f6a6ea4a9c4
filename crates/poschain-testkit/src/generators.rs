//! Proptest generators for property-based testing.

use proptest::prelude::*;

use poschain_core::{Block, CardId, Transaction};

/// Generate a card ID from a small pool, so balances collide.
pub fn card_id() -> impl Strategy<Value = CardId> {
    (0i64..8).prop_map(CardId)
}

/// Generate a signed amount over the full `i64` range, bounds included.
pub fn amount() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(i64::MAX),
        Just(i64::MIN),
        -10_000i64..=10_000i64,
        any::<i64>(),
    ]
}

/// Generate a terminal identifier.
pub fn signer_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a transaction.
pub fn transaction() -> impl Strategy<Value = Transaction> {
    (card_id(), amount(), signer_id())
        .prop_map(|(card, amount, signer)| Transaction::new(card, amount, signer))
}

/// Generate a timestamp string.
pub fn timestamp() -> impl Strategy<Value = String> {
    (0u64..=1_900_000_000_000u64).prop_map(|ms| ms.to_string())
}

/// Generate a valid chain of 1 to `max_len` blocks.
pub fn chain(max_len: usize) -> impl Strategy<Value = Vec<Block>> {
    prop::collection::vec((transaction(), timestamp()), 0..max_len.max(1)).prop_map(|entries| {
        let mut chain = vec![Block::genesis()];
        for (tx, ts) in entries {
            let next = Block::successor(&chain[chain.len() - 1], tx, ts);
            chain.push(next);
        }
        chain
    })
}

/// Parameters for a single-field mutation of a valid chain.
#[derive(Debug, Clone)]
pub struct Tamper {
    /// Block to mutate (never genesis when the chain has more blocks).
    pub position: usize,
    pub kind: TamperKind,
}

/// Which field to mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TamperKind {
    Amount,
    Card,
    Signer,
    Hash,
    PrevHash,
}

/// Generate a tamper kind.
pub fn tamper_kind() -> impl Strategy<Value = TamperKind> {
    prop_oneof![
        Just(TamperKind::Amount),
        Just(TamperKind::Card),
        Just(TamperKind::Signer),
        Just(TamperKind::Hash),
        Just(TamperKind::PrevHash),
    ]
}

impl Tamper {
    /// Apply this mutation to `chain` in place.
    pub fn apply(&self, chain: &mut [Block]) {
        let block = &mut chain[self.position];
        match self.kind {
            TamperKind::Amount => {
                block.transaction.amount = block.transaction.amount.wrapping_add(1)
            }
            TamperKind::Card => block.transaction.card_id = CardId(block.transaction.card_id.0 ^ 1),
            TamperKind::Signer => block.transaction.signer_id.push('!'),
            TamperKind::Hash => block.hash = poschain_core::BlockHash::digest(block.hash.as_bytes()),
            TamperKind::PrevHash => {
                block.prev_hash = poschain_core::BlockHash::digest(block.prev_hash.as_bytes())
            }
        }
    }
}

/// Generate a valid chain of at least two blocks with a tamper aimed at it.
pub fn tampered_chain(max_len: usize) -> impl Strategy<Value = (Vec<Block>, Tamper)> {
    prop::collection::vec((transaction(), timestamp()), 1..max_len.max(2))
        .prop_flat_map(|entries| {
            let len = entries.len() + 1;
            (Just(entries), 1..len, tamper_kind())
        })
        .prop_map(|(entries, position, kind)| {
            let mut chain = vec![Block::genesis()];
            for (tx, ts) in entries {
                let next = Block::successor(&chain[chain.len() - 1], tx, ts);
                chain.push(next);
            }
            (chain, Tamper { position, kind })
        })
}
