//! Card balances derived from the chain.

use std::collections::HashMap;

use poschain_core::{Block, CardId, Transaction};

/// Cumulative balance per card.
///
/// Always equal to the fold of the owning ledger's chain. Sums wrap at the
/// `i64` bounds, so a balance is exact whenever the true sum fits in `i64`,
/// whatever the order of intermediate overflows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceIndex {
    balances: HashMap<CardId, i64>,
}

impl BalanceIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a whole chain into a fresh index.
    pub fn from_chain(blocks: &[Block]) -> Self {
        let mut index = Self::new();
        for block in blocks {
            index.apply(&block.transaction);
        }
        index
    }

    /// Add one transaction's amount to its card.
    pub fn apply(&mut self, transaction: &Transaction) {
        let entry = self.balances.entry(transaction.card_id).or_insert(0);
        *entry = entry.wrapping_add(transaction.amount);
    }

    /// Balance of a card; 0 if never seen.
    pub fn get(&self, card: CardId) -> i64 {
        self.balances.get(&card).copied().unwrap_or(0)
    }

    /// Number of cards with an entry.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Iterate over `(card, balance)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (CardId, i64)> + '_ {
        self.balances.iter().map(|(card, balance)| (*card, *balance))
    }
}
