//! Blocks: one transaction each, linked by hash to their predecessor.

use serde::{Deserialize, Serialize};

use crate::crypto::BlockHash;
use crate::transaction::Transaction;

/// Timestamp recorded on the genesis block.
pub const GENESIS_TIMESTAMP: &str = "0";

/// A single ledger entry.
///
/// `hash` covers `index`, `prev_hash` and the transaction's canonical string.
/// `timestamp` is informational and not hashed, so peers never need to agree
/// on wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "Index")]
    pub index: u64,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Trans")]
    pub transaction: Transaction,
    #[serde(rename = "Hash")]
    pub hash: BlockHash,
    #[serde(rename = "PrevHash")]
    pub prev_hash: BlockHash,
}

impl Block {
    /// The fixed first block of every chain.
    pub fn genesis() -> Self {
        Self::sealed(
            0,
            GENESIS_TIMESTAMP.to_string(),
            Transaction::zero(),
            BlockHash::ZERO,
        )
    }

    /// Build the block that extends `prev` with `transaction`.
    pub fn successor(prev: &Block, transaction: Transaction, timestamp: impl Into<String>) -> Self {
        Self::sealed(prev.index + 1, timestamp.into(), transaction, prev.hash)
    }

    fn sealed(index: u64, timestamp: String, transaction: Transaction, prev_hash: BlockHash) -> Self {
        let hash = compute_hash(index, &prev_hash, &transaction);
        Self {
            index,
            timestamp,
            transaction,
            hash,
            prev_hash,
        }
    }

    /// Recompute the digest from this block's contents.
    pub fn compute_hash(&self) -> BlockHash {
        compute_hash(self.index, &self.prev_hash, &self.transaction)
    }

    /// Whether this block is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash.is_zero()
    }

    /// One line of the human-readable chain export.
    pub fn dump_line(&self) -> String {
        format!(
            "Index {} | Hash {} | PrevHash {} | CardID {} | Amount {}  | PosID {}",
            self.index,
            self.hash,
            self.prev_hash,
            self.transaction.card_id,
            self.transaction.amount,
            self.transaction.signer_id
        )
    }
}

/// `H(index ∥ prevHash ∥ transaction.canonical_string())`.
pub fn compute_hash(index: u64, prev_hash: &BlockHash, transaction: &Transaction) -> BlockHash {
    let record = format!(
        "{}{}{}",
        index,
        prev_hash.to_wire_string(),
        transaction.canonical_string()
    );
    BlockHash::digest(record.as_bytes())
}

/// Render a whole chain in the export format, one block per line.
///
/// The dump is for people; it is not meant to be parsed back.
pub fn dump_chain(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(&block.dump_line());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_fixed() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a, b);
        assert!(a.is_genesis());
        assert_eq!(a.hash, a.compute_hash());
        assert_eq!(a.prev_hash, BlockHash::ZERO);
    }

    #[test]
    fn test_timestamp_not_hashed() {
        let genesis = Block::genesis();
        let tx = Transaction::new(7, 50, "pos");
        let a = Block::successor(&genesis, tx.clone(), "1000");
        let b = Block::successor(&genesis, tx, "2000");
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_successor_links() {
        let genesis = Block::genesis();
        let block = Block::successor(&genesis, Transaction::new(1, 10, "pos"), "1");
        assert_eq!(block.index, 1);
        assert_eq!(block.prev_hash, genesis.hash);
        assert_eq!(block.hash, block.compute_hash());
    }

    #[test]
    fn test_transaction_changes_hash() {
        let genesis = Block::genesis();
        let a = Block::successor(&genesis, Transaction::new(1, 10, "pos"), "1");
        let b = Block::successor(&genesis, Transaction::new(1, 11, "pos"), "1");
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(Block::genesis()).unwrap();
        assert_eq!(value["Index"], 0);
        assert_eq!(value["Timestamp"], "0");
        assert_eq!(value["PrevHash"], "");
        assert_eq!(value["Trans"]["SignerID"], "0");
        assert_eq!(value["Hash"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_dump_chain_one_line_per_block() {
        let genesis = Block::genesis();
        let next = Block::successor(&genesis, Transaction::new(9, -5, "term"), "1");
        let dump = dump_chain(&[genesis.clone(), next.clone()]);

        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Index 0 | Hash "));
        assert!(lines[0].contains("| PrevHash  |"));
        assert!(lines[1].contains(&format!("PrevHash {}", genesis.hash.to_hex())));
        assert!(lines[1].ends_with("CardID 9 | Amount -5  | PosID term"));
    }
}
