//! Chained-transaction orchestrator.
//!
//! Drives two dependent transactions through build, sign and submit:
//!
//! ```text
//! sign_first   utxos -> [out0: chain amount to self, change] -> sign -> hash  (slot First)
//! sign_second  [in: First#0] -> [change]                      -> sign -> hash  (slot Second)
//! submit_both  submit First, compare id; submit Second, compare id
//! ```
//!
//! The second transaction spends an output that only exists once the first
//! is on chain, so submission order matters; nothing waits for the first to
//! be confirmed before the second is sent.

use std::future::Future;

use chain_ada::{explorer_tx_url, tx_hash, Address, Asset, TxBuilder, TxHash};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ChainingConfig, SubmitMode};
use crate::error::ChainingError;
use crate::provider::WalletProvider;
use crate::slot::{ChainSnapshot, SignedTx, Slot, SlotSnapshot, SlotState};

/// What happened to one slot during `submit_both`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The network returned the local id; the slot is `Submitted`.
    Accepted { tx_hash: TxHash },
    /// Strict mode: the ids differ and the slot stays `Signed`.
    Mismatch { expected: TxHash, returned: TxHash },
    /// Lenient mode: the ids differ but the slot was marked `Submitted`.
    AcceptedWithMismatch { expected: TxHash, returned: TxHash },
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, SubmitOutcome::Mismatch { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub first: SubmitOutcome,
    pub second: SubmitOutcome,
}

pub struct ChainOrchestrator<W> {
    wallet: W,
    config: ChainingConfig,
    first: SlotState,
    second: SlotState,
}

impl<W: WalletProvider> ChainOrchestrator<W> {
    pub fn new(wallet: W, config: ChainingConfig) -> Self {
        Self {
            wallet,
            config,
            first: SlotState::Empty,
            second: SlotState::Empty,
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn config(&self) -> &ChainingConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Build, sign and hash the first transaction: the chain amount paid to
    /// the connected account, change back to it, funded by its records.
    pub async fn sign_first(&mut self) -> Result<TxHash, ChainingError> {
        self.ensure_not_submitted(Slot::First)?;
        self.ensure_not_submitted(Slot::Second)?;

        let address = self.connected_address().await?;
        let utxos = self.call("get_utxos", self.wallet.get_utxos()).await??;
        debug!(records = utxos.len(), %address, "fetched funding records");

        let unsigned = TxBuilder::new(self.config.fee_params())
            .tx_out(&address, &[Asset::lovelace(self.config.chain_amount_lovelace)])
            .change_address(&address)
            .select_utxos_from(&utxos)
            .complete()?;
        debug!(
            inputs = unsigned.body.inputs.len(),
            outputs = unsigned.body.outputs.len(),
            fee = unsigned.body.fee,
            "built first transaction"
        );

        let signed = self.sign_and_hash(unsigned.to_cbor()).await?;
        let hash = signed.tx_hash;
        info!(slot = %Slot::First, tx_hash = %hash, "transaction signed");

        self.first = SlotState::Signed(signed);
        if matches!(self.second, SlotState::Signed(_)) {
            info!("first transaction re-signed, discarding second");
            self.second = SlotState::Empty;
        }

        Ok(hash)
    }

    /// Build, sign and hash the second transaction, spending output 0 of the first.
    pub async fn sign_second(&mut self) -> Result<TxHash, ChainingError> {
        self.ensure_not_submitted(Slot::Second)?;

        let parent = self.first.tx_hash().ok_or(ChainingError::ParentNotSigned)?;
        let address = self.connected_address().await?;

        let unsigned = TxBuilder::new(self.config.fee_params())
            .tx_in(
                &parent.to_hex(),
                0,
                &[Asset::lovelace(self.config.chain_amount_lovelace)],
                &address,
            )
            .change_address(&address)
            .complete()?;
        debug!(parent = %parent, fee = unsigned.body.fee, "built second transaction");

        let signed = self.sign_and_hash(unsigned.to_cbor()).await?;
        let hash = signed.tx_hash;
        info!(slot = %Slot::Second, tx_hash = %hash, parent = %parent, "transaction signed");

        self.second = SlotState::Signed(signed);
        Ok(hash)
    }

    /// Submit the first transaction, then the second.
    ///
    /// The second is attempted even when the first id did not match. A wallet
    /// error aborts the call and leaves the remaining slot untouched.
    pub async fn submit_both(&mut self) -> Result<SubmissionReport, ChainingError> {
        let first = self.submit_slot(Slot::First).await?;
        let second = self.submit_slot(Slot::Second).await?;
        Ok(SubmissionReport { first, second })
    }

    async fn submit_slot(&mut self, slot: Slot) -> Result<SubmitOutcome, ChainingError> {
        let signed = self
            .slot(slot)
            .signed_tx()
            .cloned()
            .ok_or(ChainingError::SlotNotSigned(slot))?;

        info!(%slot, tx_hash = %signed.tx_hash, bytes = signed.payload.len(), "submitting transaction");
        let returned = self
            .call("submit_tx", self.wallet.submit_tx(&signed.payload))
            .await??;

        let expected = signed.tx_hash;
        let outcome = if returned == expected {
            self.slot_mut(slot).mark_submitted();
            SubmitOutcome::Accepted { tx_hash: expected }
        } else {
            match self.config.submit_mode {
                SubmitMode::Strict => {
                    warn!(%slot, %expected, %returned, "confirmation id mismatch, slot left unsubmitted");
                    SubmitOutcome::Mismatch { expected, returned }
                }
                SubmitMode::Lenient => {
                    warn!(%slot, %expected, %returned, "confirmation id mismatch, accepting in lenient mode");
                    self.slot_mut(slot).mark_submitted();
                    SubmitOutcome::AcceptedWithMismatch { expected, returned }
                }
            }
        };

        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn slot(&self, slot: Slot) -> &SlotState {
        match slot {
            Slot::First => &self.first,
            Slot::Second => &self.second,
        }
    }

    pub fn identifier(&self, slot: Slot) -> Option<TxHash> {
        self.slot(slot).tx_hash()
    }

    pub fn is_submitted(&self, slot: Slot) -> bool {
        self.slot(slot).is_submitted()
    }

    /// Explorer link, available once the slot is submitted.
    pub fn explorer_url(&self, slot: Slot) -> Option<String> {
        match self.slot(slot) {
            SlotState::Submitted(tx) => Some(explorer_tx_url(
                self.config.explorer_base_url(),
                &tx.tx_hash.to_hex(),
            )),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            first: self.slot_snapshot(Slot::First),
            second: self.slot_snapshot(Slot::Second),
        }
    }

    fn slot_snapshot(&self, slot: Slot) -> SlotSnapshot {
        let state = self.slot(slot);
        SlotSnapshot {
            slot,
            status: state.status(),
            tx_hash: state.tx_hash(),
            payload_hex: state.signed_tx().map(SignedTx::payload_hex),
            explorer_url: self.explorer_url(slot),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotState {
        match slot {
            Slot::First => &mut self.first,
            Slot::Second => &mut self.second,
        }
    }

    fn ensure_not_submitted(&self, slot: Slot) -> Result<(), ChainingError> {
        if self.slot(slot).is_submitted() {
            return Err(ChainingError::SlotAlreadySubmitted(slot));
        }
        Ok(())
    }

    async fn connected_address(&self) -> Result<Address, ChainingError> {
        self.call("account", self.wallet.account())
            .await?
            .map(|account| account.address)
            .ok_or(ChainingError::WalletNotConnected)
    }

    async fn sign_and_hash(&self, unsigned: Vec<u8>) -> Result<SignedTx, ChainingError> {
        let payload = self.call("sign_tx", self.wallet.sign_tx(&unsigned)).await??;
        let tx_hash = tx_hash(&payload).map_err(ChainingError::Hash)?;
        Ok(SignedTx { payload, tx_hash })
    }

    /// Await a wallet call under the configured timeout.
    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T, ChainingError> {
        match self.config.wallet_timeout() {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                warn!(operation, secs = limit.as_secs(), "wallet call timed out");
                ChainingError::WalletTimeout {
                    operation,
                    secs: limit.as_secs(),
                }
            }),
            None => Ok(fut.await),
        }
    }
}
