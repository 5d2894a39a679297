use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::asset::{lovelace_of, Asset};
use crate::error::AdaError;
use crate::transaction::{TxHash, TxInput};

/// A funding record: an unspent output of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Id of the transaction that created this output.
    pub tx_hash: TxHash,
    /// Output index within that transaction.
    pub output_index: u32,
    /// Owner of the output.
    pub address: Address,
    /// Value held by the output.
    pub amount: Vec<Asset>,
}

impl Utxo {
    pub fn lovelace(&self) -> Result<u64, AdaError> {
        lovelace_of(&self.amount)
    }

    /// Reference to this output as a transaction input.
    pub fn input(&self) -> TxInput {
        TxInput {
            tx_hash: self.tx_hash,
            index: self.output_index,
        }
    }
}

/// Order funding records largest-first for greedy selection.
///
/// Records holding anything besides lovelace are left out. Ties are broken
/// by output reference so the order is deterministic.
pub fn sort_largest_first(utxos: &[Utxo]) -> Result<Vec<(&Utxo, u64)>, AdaError> {
    let mut valued = utxos
        .iter()
        .filter(|u| u.amount.iter().all(Asset::is_lovelace))
        .map(|u| u.lovelace().map(|v| (u, v)))
        .collect::<Result<Vec<_>, _>>()?;
    valued.sort_by(|(a, va), (b, vb)| vb.cmp(va).then_with(|| a.input().cmp(&b.input())));
    Ok(valued)
}
