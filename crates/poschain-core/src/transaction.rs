//! Point-of-sale transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::CardId;

/// A balance delta on a card, recorded by a terminal.
///
/// The sign of `amount` distinguishes charges from refunds by convention only.
/// `signer_id` is an unauthenticated terminal label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "CardID")]
    pub card_id: CardId,
    #[serde(rename = "Amount")]
    pub amount: i64,
    #[serde(rename = "SignerID")]
    pub signer_id: String,
}

impl Transaction {
    pub fn new(card_id: impl Into<CardId>, amount: i64, signer_id: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            amount,
            signer_id: signer_id.into(),
        }
    }

    /// The transaction carried by the genesis block.
    pub fn zero() -> Self {
        Self::new(CardId::ZERO, 0, "0")
    }

    /// Canonical string form. It feeds the block hash and is also what
    /// the UI shows for an accepted block, so its format is fixed.
    pub fn canonical_string(&self) -> String {
        format!(
            "Card {} | Amount by {} | Pos {}",
            self.card_id, self.amount, self.signer_id
        )
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}
