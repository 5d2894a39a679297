use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::MutexGuard;

use async_trait::async_trait;
use chain_ada::{sign_transaction, AdaNetwork, Address, TxHash, Utxo};
use ed25519_dalek::SigningKey;
use tracing::debug;
use zeroize::Zeroize;

use super::keys::{derive_ed25519_key, generate_mnemonic, mnemonic_to_seed};
use super::ledger::{MemoryLedger, SharedLedger};
use crate::error::{ChainingError, ProviderError};
use crate::provider::{ConnectedAccount, WalletProvider};

/// Software wallet holding one payment key, backed by a shared in-memory ledger.
///
/// Starts disconnected; call [`MemoryWallet::connect`] before handing it to
/// an orchestrator.
pub struct MemoryWallet {
    signing_key: SigningKey,
    address: Address,
    ledger: SharedLedger,
    connected: AtomicBool,
}

impl MemoryWallet {
    pub fn from_signing_key(signing_key: SigningKey, network: AdaNetwork, ledger: SharedLedger) -> Self {
        let address = Address::from_verifying_key(&signing_key.verifying_key().to_bytes(), network);
        Self {
            signing_key,
            address,
            ledger,
            connected: AtomicBool::new(false),
        }
    }

    /// Restore the key at `m/1852'/1815'/account'/0'/index'` of a BIP-39 mnemonic.
    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        network: AdaNetwork,
        account: u32,
        index: u32,
        ledger: SharedLedger,
    ) -> Result<Self, ChainingError> {
        let mut seed = mnemonic_to_seed(phrase, passphrase)?;
        let derived = derive_ed25519_key(&seed, account, index);
        seed.zeroize();
        let derived = derived?;

        debug!(path = %derived.derivation_path, "derived payment key");
        let signing_key = SigningKey::from_bytes(&derived.private_key);
        Ok(Self::from_signing_key(signing_key, network, ledger))
    }

    /// Create a wallet from a fresh 24-word mnemonic. The phrase is returned
    /// alongside so it can be shown or stored.
    pub fn generate(network: AdaNetwork, ledger: SharedLedger) -> Result<(Self, String), ChainingError> {
        let phrase = generate_mnemonic()?;
        let wallet = Self::from_mnemonic(&phrase, "", network, 0, 0, ledger)?;
        Ok((wallet, phrase))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<(), ProviderError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ProviderError::Disconnected)
        }
    }

    fn lock_ledger(&self) -> Result<MutexGuard<'_, MemoryLedger>, ProviderError> {
        self.ledger
            .lock()
            .map_err(|_| ProviderError::Other("ledger lock poisoned".into()))
    }
}

#[async_trait]
impl WalletProvider for MemoryWallet {
    async fn account(&self) -> Option<ConnectedAccount> {
        self.is_connected().then(|| ConnectedAccount {
            address: self.address,
        })
    }

    async fn get_utxos(&self) -> Result<Vec<Utxo>, ProviderError> {
        self.ensure_connected()?;
        let utxos = self.lock_ledger()?.utxos_at(&self.address);
        Ok(utxos)
    }

    async fn sign_tx(&self, payload: &[u8]) -> Result<Vec<u8>, ProviderError> {
        self.ensure_connected()?;
        sign_transaction(payload, &self.signing_key).map_err(|e| ProviderError::Rejected(e.to_string()))
    }

    async fn submit_tx(&self, signed_payload: &[u8]) -> Result<TxHash, ProviderError> {
        self.ensure_connected()?;
        let hash = self.lock_ledger()?.submit(signed_payload)?;
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_ada::{Asset, FeeParams, TxBuilder};

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn shared_ledger() -> SharedLedger {
        MemoryLedger::new(AdaNetwork::Preprod, FeeParams::default()).shared()
    }

    fn wallet(ledger: SharedLedger) -> MemoryWallet {
        MemoryWallet::from_mnemonic(TEST_MNEMONIC, "", AdaNetwork::Preprod, 0, 0, ledger).unwrap()
    }

    #[test]
    fn mnemonic_restore_is_deterministic() {
        let ledger = shared_ledger();
        let a = wallet(ledger.clone());
        let b = wallet(ledger);
        assert_eq!(a.address(), b.address());
        assert!(a.address().to_bech32().starts_with("addr_test1"));
    }

    #[test]
    fn different_index_gives_different_address() {
        let ledger = shared_ledger();
        let a = wallet(ledger.clone());
        let b = MemoryWallet::from_mnemonic(TEST_MNEMONIC, "", AdaNetwork::Preprod, 0, 1, ledger).unwrap();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn generated_wallet_restores_from_its_phrase() {
        let ledger = shared_ledger();
        let (generated, phrase) = MemoryWallet::generate(AdaNetwork::Preprod, ledger.clone()).unwrap();
        let restored = MemoryWallet::from_mnemonic(&phrase, "", AdaNetwork::Preprod, 0, 0, ledger).unwrap();
        assert_eq!(generated.address(), restored.address());
    }

    #[test]
    fn bad_mnemonic_is_rejected() {
        let result = MemoryWallet::from_mnemonic("not a mnemonic", "", AdaNetwork::Preprod, 0, 0, shared_ledger());
        assert!(matches!(result, Err(ChainingError::InvalidMnemonic(_))));
    }

    #[tokio::test]
    async fn disconnected_wallet_refuses_everything() {
        let w = wallet(shared_ledger());
        assert!(!w.is_connected());
        assert!(w.account().await.is_none());
        assert!(matches!(w.get_utxos().await, Err(ProviderError::Disconnected)));
        assert!(matches!(w.sign_tx(&[]).await, Err(ProviderError::Disconnected)));
        assert!(matches!(w.submit_tx(&[]).await, Err(ProviderError::Disconnected)));
    }

    #[tokio::test]
    async fn connect_and_disconnect() {
        let w = wallet(shared_ledger());
        w.connect();
        assert_eq!(w.account().await.unwrap().address, w.address());
        w.disconnect();
        assert!(w.account().await.is_none());
    }

    #[tokio::test]
    async fn signs_and_submits_against_shared_ledger() {
        let ledger = shared_ledger();
        let w = wallet(ledger.clone());
        ledger.lock().unwrap().fund(&w.address(), 15_000_000);
        w.connect();

        let utxos = w.get_utxos().await.unwrap();
        assert_eq!(utxos.len(), 1);

        let unsigned = TxBuilder::default()
            .tx_out(&w.address(), &[Asset::lovelace(10_000_000)])
            .change_address(&w.address())
            .select_utxos_from(&utxos)
            .complete()
            .unwrap();
        let signed = w.sign_tx(&unsigned.to_cbor()).await.unwrap();
        assert_eq!(chain_ada::tx_hash(&signed).unwrap(), unsigned.hash());

        let hash = w.submit_tx(&signed).await.unwrap();
        assert_eq!(hash, unsigned.hash());
        assert!(ledger.lock().unwrap().contains_tx(&hash));
    }

    #[tokio::test]
    async fn sign_rejects_garbage() {
        let w = wallet(shared_ledger());
        w.connect();
        assert!(matches!(w.sign_tx(&[0xff]).await, Err(ProviderError::Rejected(_))));
    }

    #[tokio::test]
    async fn ledger_rejection_is_a_submission_error() {
        let w = wallet(shared_ledger());
        w.connect();
        assert!(matches!(w.submit_tx(&[0x80]).await, Err(ProviderError::Submission(_))));
    }
}
