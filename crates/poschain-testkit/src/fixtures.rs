//! Test fixtures and helpers.
//!
//! Common chain and ledger setup for integration tests.

use poschain_core::{Block, BlockHash, Transaction};
use poschain_ledger::Ledger;

/// Build a valid chain: genesis followed by one block per transaction.
pub fn chain_with(transactions: &[Transaction]) -> Vec<Block> {
    let mut chain = vec![Block::genesis()];
    for tx in transactions {
        let prev = &chain[chain.len() - 1];
        let next = Block::successor(prev, tx.clone(), now_millis().to_string());
        chain.push(next);
    }
    chain
}

/// A valid chain of `length` blocks (genesis included).
///
/// Block `i` credits `card` with `i * 10`, so the card's balance on the
/// full chain is `10 * (1 + 2 + ... + (length - 1))`.
pub fn chain_of_length(length: usize, card: i64) -> Vec<Block> {
    chain_with(&sale_transactions(length.saturating_sub(1), card))
}

/// Transactions `1..=count` crediting `card` with `i * 10`.
pub fn sale_transactions(count: usize, card: i64) -> Vec<Transaction> {
    (1..=count)
        .map(|i| Transaction::new(card, i as i64 * 10, "fixture"))
        .collect()
}

/// Expected balance of the credited card on [`chain_of_length`]`(length, _)`.
pub fn expected_balance(length: usize) -> i64 {
    let n = length.saturating_sub(1) as i64;
    10 * n * (n + 1) / 2
}

/// A ledger holding [`chain_of_length`]`(length, card)`.
pub fn ledger_of_length(length: usize, card: i64) -> Ledger {
    match Ledger::from_chain(chain_of_length(length, card)) {
        Ok(ledger) => ledger,
        Err(reason) => panic!("fixture chain rejected: {}", reason),
    }
}

/// Overwrite the stored hash of block `position` with garbage.
pub fn corrupt_hash(chain: &mut [Block], position: usize) {
    chain[position].hash = BlockHash::digest(b"corrupted");
}

/// Change block `position`'s amount without resealing it.
pub fn tamper_amount(chain: &mut [Block], position: usize, amount: i64) {
    chain[position].transaction.amount = amount;
}

fn now_millis() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
