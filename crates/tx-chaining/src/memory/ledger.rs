//! In-memory UTXO ledger.
//!
//! Accepted transactions are applied immediately, so an output created by a
//! transaction that is not yet "confirmed" can be spent by the next one.
//! That is exactly what the second chained transaction relies on.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use chain_ada::hash::blake2b_256;
use chain_ada::{
    AdaError, AdaNetwork, Address, Asset, FeeParams, Transaction, TxHash, TxInput, TxOutput, Utxo,
    MIN_UTXO_LOVELACE,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ProviderError;

pub type SharedLedger = Arc<Mutex<MemoryLedger>>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Malformed transaction: {0}")]
    Malformed(#[source] AdaError),

    #[error("Transaction has no inputs")]
    NoInputs,

    #[error("Input {0} is spent or does not exist")]
    UnknownInput(TxInput),

    #[error("Input {0} is spent twice")]
    DuplicateInput(TxInput),

    #[error("Invalid witness: {0}")]
    InvalidWitness(#[source] AdaError),

    #[error("Input {0} is not authorized by any witness")]
    MissingWitness(TxInput),

    #[error("Output {index} pays to an address on another network")]
    WrongNetwork { index: usize },

    #[error("Output {index} holds {lovelace} lovelace, below the minimum UTxO value")]
    OutputTooSmall { index: usize, lovelace: u64 },

    #[error("Value not preserved: inputs {inputs}, outputs {outputs}, fee {fee}")]
    Unbalanced { inputs: u64, outputs: u64, fee: u64 },

    #[error("Fee {fee} is below the minimum of {min_fee}")]
    FeeTooSmall { fee: u64, min_fee: u64 },

    #[error("Value overflows u64")]
    Overflow,
}

impl From<LedgerError> for ProviderError {
    fn from(e: LedgerError) -> Self {
        ProviderError::Submission(e.to_string())
    }
}

#[derive(Debug)]
pub struct MemoryLedger {
    network: AdaNetwork,
    fee_params: FeeParams,
    utxos: BTreeMap<TxInput, TxOutput>,
    accepted: BTreeSet<TxHash>,
    genesis_count: u64,
}

impl MemoryLedger {
    pub fn new(network: AdaNetwork, fee_params: FeeParams) -> Self {
        Self {
            network,
            fee_params,
            utxos: BTreeMap::new(),
            accepted: BTreeSet::new(),
            genesis_count: 0,
        }
    }

    pub fn shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    pub fn network(&self) -> AdaNetwork {
        self.network
    }

    /// Create a genesis record paying `lovelace` to `address`.
    pub fn fund(&mut self, address: &Address, lovelace: u64) -> Utxo {
        let mut seed = b"genesis".to_vec();
        seed.extend_from_slice(&self.genesis_count.to_be_bytes());
        self.genesis_count += 1;

        let input = TxInput {
            tx_hash: TxHash::from_bytes(blake2b_256(&seed)),
            index: 0,
        };
        let output = TxOutput {
            address: *address,
            lovelace,
        };
        let utxo = to_utxo(&input, &output);
        self.utxos.insert(input, output);
        debug!(%input, %address, lovelace, "funded address");

        utxo
    }

    /// Unspent records owned by `address`, in output-reference order.
    pub fn utxos_at(&self, address: &Address) -> Vec<Utxo> {
        self.utxos
            .iter()
            .filter(|(_, output)| output.address == *address)
            .map(|(input, output)| to_utxo(input, output))
            .collect()
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.utxos
            .values()
            .filter(|output| output.address == *address)
            .map(|output| output.lovelace)
            .sum()
    }

    pub fn is_unspent(&self, input: &TxInput) -> bool {
        self.utxos.contains_key(input)
    }

    pub fn contains_tx(&self, hash: &TxHash) -> bool {
        self.accepted.contains(hash)
    }

    /// Validate a signed payload and apply it. Returns its transaction id.
    ///
    /// Submitting an already accepted transaction again succeeds without
    /// touching the UTXO set.
    pub fn submit(&mut self, payload: &[u8]) -> Result<TxHash, LedgerError> {
        let tx = Transaction::from_cbor(payload).map_err(LedgerError::Malformed)?;
        let hash = tx.hash();

        if self.accepted.contains(&hash) {
            debug!(tx_hash = %hash, "transaction already accepted");
            return Ok(hash);
        }

        if let Err(e) = self.validate(&tx, payload.len()) {
            warn!(tx_hash = %hash, error = %e, "transaction rejected");
            return Err(e);
        }

        for input in &tx.body.inputs {
            self.utxos.remove(input);
        }
        for (index, output) in tx.body.outputs.iter().enumerate() {
            self.utxos.insert(
                TxInput {
                    tx_hash: hash,
                    index: index as u32,
                },
                output.clone(),
            );
        }
        self.accepted.insert(hash);

        info!(
            tx_hash = %hash,
            inputs = tx.body.inputs.len(),
            outputs = tx.body.outputs.len(),
            fee = tx.body.fee,
            "transaction accepted"
        );
        Ok(hash)
    }

    fn validate(&self, tx: &Transaction, size: usize) -> Result<(), LedgerError> {
        let body = &tx.body;
        if body.inputs.is_empty() {
            return Err(LedgerError::NoInputs);
        }

        let signers = tx.verified_signers().map_err(LedgerError::InvalidWitness)?;

        let mut seen = BTreeSet::new();
        let mut input_total: u64 = 0;
        for input in &body.inputs {
            if !seen.insert(*input) {
                return Err(LedgerError::DuplicateInput(*input));
            }
            let spent = self
                .utxos
                .get(input)
                .ok_or(LedgerError::UnknownInput(*input))?;
            if !signers.contains(spent.address.payment_key_hash()) {
                return Err(LedgerError::MissingWitness(*input));
            }
            input_total = input_total
                .checked_add(spent.lovelace)
                .ok_or(LedgerError::Overflow)?;
        }

        for (index, output) in body.outputs.iter().enumerate() {
            if !output.address.is_on(self.network) {
                return Err(LedgerError::WrongNetwork { index });
            }
            if output.lovelace < MIN_UTXO_LOVELACE {
                return Err(LedgerError::OutputTooSmall {
                    index,
                    lovelace: output.lovelace,
                });
            }
        }

        let output_total = body.total_output().map_err(|_| LedgerError::Overflow)?;
        let consumed = output_total
            .checked_add(body.fee)
            .ok_or(LedgerError::Overflow)?;
        if input_total != consumed {
            return Err(LedgerError::Unbalanced {
                inputs: input_total,
                outputs: output_total,
                fee: body.fee,
            });
        }

        let min_fee = self.fee_params.min_fee(size);
        if body.fee < min_fee {
            return Err(LedgerError::FeeTooSmall {
                fee: body.fee,
                min_fee,
            });
        }

        Ok(())
    }
}

fn to_utxo(input: &TxInput, output: &TxOutput) -> Utxo {
    Utxo {
        tx_hash: input.tx_hash,
        output_index: input.index,
        address: output.address,
        amount: vec![Asset::lovelace(output.lovelace)],
    }
}
