//! Per-transaction lifecycle state.
//!
//! Each slot moves strictly forward: `Empty -> Signed -> Submitted`. The
//! signed payload and its id live inside the variants, so an id without a
//! payload (or a submitted slot without either) cannot be represented.

use std::fmt;

use chain_ada::TxHash;
use serde::{Deserialize, Serialize};

/// Which of the two chained transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// The parent: pays the chain amount to the connected account.
    First,
    /// The child: spends output 0 of the parent.
    Second,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::First => write!(f, "first"),
            Slot::Second => write!(f, "second"),
        }
    }
}

/// A signed payload together with its transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub payload: Vec<u8>,
    pub tx_hash: TxHash,
}

impl SignedTx {
    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Signed(SignedTx),
    Submitted(SignedTx),
}

impl SlotState {
    pub fn status(&self) -> SlotStatus {
        match self {
            SlotState::Empty => SlotStatus::Empty,
            SlotState::Signed(_) => SlotStatus::Signed,
            SlotState::Submitted(_) => SlotStatus::Submitted,
        }
    }

    pub fn signed_tx(&self) -> Option<&SignedTx> {
        match self {
            SlotState::Empty => None,
            SlotState::Signed(tx) | SlotState::Submitted(tx) => Some(tx),
        }
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        self.signed_tx().map(|tx| tx.tx_hash)
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, SlotState::Submitted(_))
    }

    /// `Signed -> Submitted`. Any other state is left as it is.
    pub(crate) fn mark_submitted(&mut self) {
        *self = match std::mem::take(self) {
            SlotState::Signed(tx) => SlotState::Submitted(tx),
            other => other,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Empty,
    Signed,
    Submitted,
}

/// Serializable view of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSnapshot {
    pub slot: Slot,
    pub status: SlotStatus,
    pub tx_hash: Option<TxHash>,
    pub payload_hex: Option<String>,
    pub explorer_url: Option<String>,
}

/// Serializable view of both slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainSnapshot {
    pub first: SlotSnapshot,
    pub second: SlotSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed() -> SignedTx {
        SignedTx {
            payload: vec![0x84, 0xa0],
            tx_hash: TxHash::from_bytes([3; 32]),
        }
    }

    #[test]
    fn empty_slot_has_no_hash() {
        let slot = SlotState::default();
        assert_eq!(slot.status(), SlotStatus::Empty);
        assert!(slot.tx_hash().is_none());
        assert!(slot.signed_tx().is_none());
        assert!(!slot.is_submitted());
    }

    #[test]
    fn signed_slot_exposes_hash_and_payload() {
        let slot = SlotState::Signed(signed());
        assert_eq!(slot.status(), SlotStatus::Signed);
        assert_eq!(slot.tx_hash(), Some(TxHash::from_bytes([3; 32])));
        assert_eq!(slot.signed_tx().unwrap().payload_hex(), "84a0");
    }

    #[test]
    fn mark_submitted_moves_forward_only() {
        let mut slot = SlotState::Signed(signed());
        slot.mark_submitted();
        assert!(slot.is_submitted());

        // Submitted stays submitted.
        slot.mark_submitted();
        assert_eq!(slot, SlotState::Submitted(signed()));

        // Empty cannot jump to submitted.
        let mut empty = SlotState::Empty;
        empty.mark_submitted();
        assert_eq!(empty, SlotState::Empty);
    }

    #[test]
    fn slot_display_and_serde() {
        assert_eq!(Slot::First.to_string(), "first");
        assert_eq!(serde_json::to_string(&Slot::Second).unwrap(), "\"second\"");
        assert_eq!(serde_json::to_string(&SlotStatus::Submitted).unwrap(), "\"submitted\"");
    }
}
