//! The ledger: the chain plus its balance index.

use poschain_core::{
    check_successor, dump_chain, validate_chain, Block, CardId, RejectReason,
};

use crate::balance::BalanceIndex;

/// Owned chain state.
///
/// The chain is never empty (genesis is always present) and the balance index
/// always equals the fold of the chain. All mutation goes through
/// [`Ledger::append`] and [`Ledger::replace_with`], which leave the ledger
/// untouched when they return an error.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    balances: BalanceIndex,
}

impl Ledger {
    /// A ledger holding only the genesis block.
    pub fn new() -> Self {
        let chain = vec![Block::genesis()];
        let balances = BalanceIndex::from_chain(&chain);
        Self { chain, balances }
    }

    /// Build a ledger from a locally known chain, validating it from genesis.
    pub fn from_chain(blocks: Vec<Block>) -> Result<Self, RejectReason> {
        validate_chain(&blocks)?;
        let balances = BalanceIndex::from_chain(&blocks);
        Ok(Self {
            chain: blocks,
            balances,
        })
    }

    /// Append a single block on top of the current head.
    pub fn append(&mut self, block: Block) -> Result<(), RejectReason> {
        check_successor(&block, self.current_head())?;

        self.balances.apply(&block.transaction);
        tracing::debug!(
            index = block.index,
            hash = %block.hash,
            card = %block.transaction.card_id,
            amount = block.transaction.amount,
            "block appended"
        );
        self.chain.push(block);
        Ok(())
    }

    /// Adopt `candidate` if it is strictly longer and valid from genesis.
    ///
    /// Balances are recomputed from the adopted chain.
    pub fn replace_with(&mut self, candidate: Vec<Block>) -> Result<(), RejectReason> {
        if candidate.len() <= self.chain.len() {
            return Err(RejectReason::NotLonger {
                local: self.chain.len(),
                candidate: candidate.len(),
            });
        }

        validate_chain(&candidate)?;

        let balances = BalanceIndex::from_chain(&candidate);
        tracing::info!(
            from = self.chain.len(),
            to = candidate.len(),
            "chain replaced"
        );
        self.chain = candidate;
        self.balances = balances;
        Ok(())
    }

    /// Last block of the chain.
    pub fn current_head(&self) -> &Block {
        // The chain always holds at least the genesis block.
        &self.chain[self.chain.len() - 1]
    }

    /// Number of blocks, genesis included.
    pub fn length(&self) -> usize {
        self.chain.len()
    }

    /// Balance of `card`; 0 if unseen.
    pub fn balance_of(&self, card: CardId) -> i64 {
        self.balances.get(card)
    }

    /// The balance index.
    pub fn balances(&self) -> &BalanceIndex {
        &self.balances
    }

    /// Borrow the chain.
    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    /// An owned copy of the chain, for serialization.
    pub fn snapshot_chain(&self) -> Vec<Block> {
        self.chain.clone()
    }

    /// Human-readable dump of the chain.
    pub fn export(&self) -> String {
        dump_chain(&self.chain)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poschain_core::{BlockHash, Transaction};

    fn extend(ledger: &Ledger, tx: Transaction) -> Block {
        Block::successor(ledger.current_head(), tx, "1")
    }

    fn build_chain(txs: &[Transaction]) -> Vec<Block> {
        let mut chain = vec![Block::genesis()];
        for tx in txs {
            let next = Block::successor(chain.last().unwrap(), tx.clone(), "1");
            chain.push(next);
        }
        chain
    }

    #[test]
    fn test_new_ledger_has_genesis() {
        let ledger = Ledger::new();
        assert_eq!(ledger.length(), 1);
        assert_eq!(ledger.current_head(), &Block::genesis());
    }

    #[test]
    fn test_append_first_block() {
        let mut ledger = Ledger::new();
        let block = extend(&ledger, Transaction::new(7, 50, "pos"));

        ledger.append(block).unwrap();

        assert_eq!(ledger.length(), 2);
        assert_eq!(ledger.balance_of(CardId(7)), 50);
    }

    #[test]
    fn test_append_stale_index() {
        let mut ledger = Ledger::new();
        let first = extend(&ledger, Transaction::new(1, 10, "pos"));
        ledger.append(first.clone()).unwrap();

        let result = ledger.append(first);
        assert_eq!(
            result,
            Err(RejectReason::StaleIndex {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(ledger.length(), 2);
        assert_eq!(ledger.balance_of(CardId(1)), 10);
    }

    #[test]
    fn test_append_future_index() {
        let mut ledger = Ledger::new();
        let chain = build_chain(&[Transaction::new(1, 1, "a"), Transaction::new(1, 2, "a")]);

        assert!(matches!(
            ledger.append(chain[2].clone()),
            Err(RejectReason::StaleIndex { .. })
        ));
        assert_eq!(ledger.length(), 1);
    }

    #[test]
    fn test_append_tampered() {
        let mut ledger = Ledger::new();
        let mut block = extend(&ledger, Transaction::new(1, 10, "pos"));
        block.transaction.amount = 10_000;

        assert_eq!(
            ledger.append(block),
            Err(RejectReason::HashMismatch { index: 1 })
        );
        assert_eq!(ledger.balance_of(CardId(1)), 0);
    }

    #[test]
    fn test_append_broken_linkage() {
        let mut ledger = Ledger::new();
        let mut block = extend(&ledger, Transaction::new(1, 10, "pos"));
        block.prev_hash = BlockHash::digest(b"other");
        block.hash = block.compute_hash();

        assert_eq!(
            ledger.append(block),
            Err(RejectReason::BrokenLinkage { index: 1 })
        );
    }

    #[test]
    fn test_replace_with_longer() {
        let mut ledger = Ledger::new();
        let chain = build_chain(&[
            Transaction::new(1, 10, "a"),
            Transaction::new(2, 20, "a"),
            Transaction::new(1, -5, "b"),
        ]);

        ledger.replace_with(chain.clone()).unwrap();

        assert_eq!(ledger.length(), 4);
        assert_eq!(ledger.blocks(), chain.as_slice());
        assert_eq!(ledger.balance_of(CardId(1)), 5);
        assert_eq!(ledger.balance_of(CardId(2)), 20);
    }

    #[test]
    fn test_replace_with_not_longer() {
        let mut ledger = Ledger::new();
        ledger
            .replace_with(build_chain(&[Transaction::new(1, 10, "a")]))
            .unwrap();

        let other = build_chain(&[Transaction::new(3, 99, "b")]);
        assert_eq!(
            ledger.replace_with(other),
            Err(RejectReason::NotLonger {
                local: 2,
                candidate: 2
            })
        );
        assert_eq!(ledger.balance_of(CardId(1)), 10);
        assert_eq!(ledger.balance_of(CardId(3)), 0);
    }

    #[test]
    fn test_replace_with_invalid_leaves_state() {
        let mut ledger = Ledger::new();
        ledger
            .append(extend(&ledger, Transaction::new(4, 40, "a")))
            .unwrap();
        let before = ledger.snapshot_chain();

        let mut candidate = build_chain(&[
            Transaction::new(1, 1, "x"),
            Transaction::new(1, 2, "x"),
            Transaction::new(1, 3, "x"),
            Transaction::new(1, 4, "x"),
            Transaction::new(1, 5, "x"),
        ]);
        candidate[3].hash = BlockHash::digest(b"corrupted");

        assert!(matches!(
            ledger.replace_with(candidate),
            Err(RejectReason::InvalidChain { position: 3, .. })
        ));
        assert_eq!(ledger.snapshot_chain(), before);
        assert_eq!(ledger.balance_of(CardId(4)), 40);
        assert_eq!(ledger.balance_of(CardId(1)), 0);
    }

    #[test]
    fn test_from_chain_validates() {
        let chain = build_chain(&[Transaction::new(1, 10, "a")]);
        let ledger = Ledger::from_chain(chain).unwrap();
        assert_eq!(ledger.balance_of(CardId(1)), 10);

        assert!(Ledger::from_chain(Vec::new()).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_appends_grow_by_one_and_balances_match_fold(
            entries in proptest::collection::vec((0i64..5, -1_000i64..1_000), 0..40)
        ) {
            let mut ledger = Ledger::new();
            for (card, amount) in entries {
                let before = ledger.length();
                let block = extend(&ledger, Transaction::new(card, amount, "pos"));
                proptest::prop_assert!(ledger.append(block).is_ok());
                proptest::prop_assert_eq!(ledger.length(), before + 1);
            }
            let rebuilt = BalanceIndex::from_chain(ledger.blocks());
            proptest::prop_assert_eq!(ledger.balances(), &rebuilt);
        }

        #[test]
        fn prop_wrong_index_is_stale(
            existing in 0usize..8,
            index in proptest::prop_oneof![proptest::num::u64::ANY, 0u64..12],
            amount in -1_000i64..1_000,
        ) {
            let mut ledger = Ledger::new();
            for i in 0..existing {
                let block = extend(&ledger, Transaction::new(1, i as i64, "pos"));
                ledger.append(block).unwrap();
            }
            let expected = ledger.current_head().index + 1;
            proptest::prop_assume!(index != expected);

            // Correctly linked and sealed, only the index is off.
            let mut block = extend(&ledger, Transaction::new(2, amount, "pos"));
            block.index = index;
            block.hash = block.compute_hash();

            let before = ledger.snapshot_chain();
            proptest::prop_assert_eq!(
                ledger.append(block),
                Err(RejectReason::StaleIndex { expected, got: index })
            );
            proptest::prop_assert_eq!(ledger.snapshot_chain(), before);
            proptest::prop_assert_eq!(ledger.balance_of(CardId(2)), 0);
        }
    }

    #[test]
    fn test_export_lines() {
        let mut ledger = Ledger::new();
        ledger
            .append(extend(&ledger, Transaction::new(5, 12, "t")))
            .unwrap();
        assert_eq!(ledger.export().lines().count(), 2);
    }
}
