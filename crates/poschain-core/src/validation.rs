//! Chain validation: single-successor checks and whole-chain checks.

use crate::block::Block;
use crate::error::RejectReason;

/// Check that `candidate` may follow `predecessor`.
///
/// Checks run in a fixed order so the reported reason is stable:
/// - index must be `predecessor.index + 1`
/// - `prev_hash` must equal `predecessor.hash`
/// - `hash` must equal the recomputed digest
pub fn check_successor(candidate: &Block, predecessor: &Block) -> Result<(), RejectReason> {
    let expected = predecessor.index + 1;
    if candidate.index != expected {
        return Err(RejectReason::StaleIndex {
            expected,
            got: candidate.index,
        });
    }

    if candidate.prev_hash != predecessor.hash {
        return Err(RejectReason::BrokenLinkage {
            index: candidate.index,
        });
    }

    if candidate.compute_hash() != candidate.hash {
        return Err(RejectReason::HashMismatch {
            index: candidate.index,
        });
    }

    Ok(())
}

/// Pure predicate form of [`check_successor`].
pub fn is_valid_successor(candidate: &Block, predecessor: &Block) -> bool {
    check_successor(candidate, predecessor).is_ok()
}

/// Validate a full chain from genesis to head.
///
/// The first block must be exactly the genesis block and every adjacent pair
/// must pass [`check_successor`].
pub fn validate_chain(blocks: &[Block]) -> Result<(), RejectReason> {
    let first = blocks.first().ok_or_else(|| RejectReason::InvalidChain {
        position: 0,
        reason: "empty chain".into(),
    })?;

    let genesis = Block::genesis();
    if first.index != genesis.index
        || first.prev_hash != genesis.prev_hash
        || first.transaction != genesis.transaction
        || first.hash != genesis.hash
    {
        return Err(RejectReason::InvalidChain {
            position: 0,
            reason: "genesis block mismatch".into(),
        });
    }

    for (position, pair) in blocks.windows(2).enumerate() {
        check_successor(&pair[1], &pair[0]).map_err(|e| RejectReason::InvalidChain {
            position: position + 1,
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::BlockHash;
    use crate::transaction::Transaction;

    fn chain_of(len: usize) -> Vec<Block> {
        let mut chain = vec![Block::genesis()];
        for i in 1..len {
            let prev = chain.last().unwrap();
            let tx = Transaction::new(i as i64 % 3, 10 * i as i64, "pos");
            chain.push(Block::successor(prev, tx, i.to_string()));
        }
        chain
    }

    #[test]
    fn test_valid_successor() {
        let chain = chain_of(2);
        assert!(is_valid_successor(&chain[1], &chain[0]));
    }

    #[test]
    fn test_wrong_index() {
        let chain = chain_of(3);
        let result = check_successor(&chain[2], &chain[0]);
        assert_eq!(
            result,
            Err(RejectReason::StaleIndex {
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn test_broken_linkage() {
        let chain = chain_of(2);
        let mut block = chain[1].clone();
        block.prev_hash = BlockHash::digest(b"elsewhere");
        assert_eq!(
            check_successor(&block, &chain[0]),
            Err(RejectReason::BrokenLinkage { index: 1 })
        );
    }

    #[test]
    fn test_tampered_transaction() {
        let chain = chain_of(2);
        let mut block = chain[1].clone();
        block.transaction.amount += 1;
        assert_eq!(
            check_successor(&block, &chain[0]),
            Err(RejectReason::HashMismatch { index: 1 })
        );
    }

    #[test]
    fn test_timestamp_tamper_is_fine() {
        let chain = chain_of(2);
        let mut block = chain[1].clone();
        block.timestamp = "somewhen else".into();
        assert!(is_valid_successor(&block, &chain[0]));
    }

    #[test]
    fn test_validate_chain_ok() {
        assert!(validate_chain(&chain_of(1)).is_ok());
        assert!(validate_chain(&chain_of(6)).is_ok());
    }

    #[test]
    fn test_validate_empty_chain() {
        assert!(matches!(
            validate_chain(&[]),
            Err(RejectReason::InvalidChain { position: 0, .. })
        ));
    }

    #[test]
    fn test_validate_wrong_genesis() {
        let mut chain = chain_of(3);
        chain[0].transaction = Transaction::new(1, 1000, "forged");
        chain[0].hash = chain[0].compute_hash();
        assert!(matches!(
            validate_chain(&chain),
            Err(RejectReason::InvalidChain { position: 0, .. })
        ));
    }

    #[test]
    fn test_validate_corrupt_middle() {
        let mut chain = chain_of(6);
        chain[3].hash = BlockHash::digest(b"corrupt");
        // Block 3 fails its own hash check.
        assert!(matches!(
            validate_chain(&chain),
            Err(RejectReason::InvalidChain { position: 3, .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn prop_successor_valid_regardless_of_timestamp(
            card in -100i64..100,
            amount in proptest::num::i64::ANY,
            signer in "[a-z0-9]{1,12}",
            ts_a in "[0-9]{1,13}",
            ts_b in "[0-9]{1,13}",
        ) {
            let genesis = Block::genesis();
            let a = Block::successor(&genesis, Transaction::new(card, amount, signer.clone()), ts_a);
            let b = Block::successor(&genesis, Transaction::new(card, amount, signer), ts_b);
            proptest::prop_assert_eq!(a.hash, b.hash);
            proptest::prop_assert!(is_valid_successor(&a, &genesis));
        }

        #[test]
        fn prop_amount_change_detected(amount in -1_000_000i64..1_000_000, delta in 1i64..1_000) {
            let genesis = Block::genesis();
            let mut block = Block::successor(&genesis, Transaction::new(1, amount, "pos"), "0");
            block.transaction.amount += delta;
            proptest::prop_assert_eq!(
                check_successor(&block, &genesis),
                Err(RejectReason::HashMismatch { index: 1 })
            );
        }
    }
}
