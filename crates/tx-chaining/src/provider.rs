//! Wallet provider abstraction.
//!
//! The orchestrator never touches keys or the network directly; everything
//! goes through this trait so a browser bridge, a hardware wallet or the
//! in-memory wallet in `memory` can sit behind it.

use async_trait::async_trait;
use chain_ada::{Address, TxHash, Utxo};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// The account currently exposed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub address: Address,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// The connected account, or `None` while disconnected.
    async fn account(&self) -> Option<ConnectedAccount>;

    /// Spendable funding records of the connected account.
    async fn get_utxos(&self) -> Result<Vec<Utxo>, ProviderError>;

    /// Sign an unsigned payload and return the signed payload.
    async fn sign_tx(&self, payload: &[u8]) -> Result<Vec<u8>, ProviderError>;

    /// Submit a signed payload and return the id the network reports for it.
    async fn submit_tx(&self, signed_payload: &[u8]) -> Result<TxHash, ProviderError>;
}

#[async_trait]
impl<W: WalletProvider + ?Sized> WalletProvider for std::sync::Arc<W> {
    async fn account(&self) -> Option<ConnectedAccount> {
        (**self).account().await
    }

    async fn get_utxos(&self) -> Result<Vec<Utxo>, ProviderError> {
        (**self).get_utxos().await
    }

    async fn sign_tx(&self, payload: &[u8]) -> Result<Vec<u8>, ProviderError> {
        (**self).sign_tx(payload).await
    }

    async fn submit_tx(&self, signed_payload: &[u8]) -> Result<TxHash, ProviderError> {
        (**self).submit_tx(signed_payload).await
    }
}
