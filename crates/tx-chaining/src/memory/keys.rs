//! Mnemonic handling and SLIP-0010 Ed25519 key derivation for the software wallet.
//!
//! Cardano wallets use the CIP-1852 path `m/1852'/1815'/account'/role/index`.
//! SLIP-0010 only defines hardened Ed25519 children, so every level here is
//! hardened: `m/1852'/1815'/account'/0'/index'`. Keys derived this way are
//! not interchangeable with BIP32-Ed25519 (Icarus) wallets.

use bip39::{Language, Mnemonic};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha512;
use zeroize::Zeroize;

use crate::error::ChainingError;

type HmacSha512 = Hmac<Sha512>;

const PURPOSE: u32 = 1852;
const COIN_TYPE: u32 = 1815;
const HARDENED: u32 = 0x8000_0000;

/// Generate a new 24-word BIP-39 mnemonic (256 bits of entropy).
pub fn generate_mnemonic() -> Result<String, ChainingError> {
    let mut entropy = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| ChainingError::InvalidMnemonic(e.to_string()));
    entropy.zeroize();
    Ok(mnemonic?.to_string())
}

/// Derive seed bytes from mnemonic + optional passphrase.
/// Caller MUST zeroize the returned seed when done.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Vec<u8>, ChainingError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| ChainingError::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_seed(passphrase).to_vec())
}

pub fn derivation_path(account: u32, index: u32) -> String {
    format!("m/{PURPOSE}'/{COIN_TYPE}'/{account}'/0'/{index}'")
}

/// Derived Ed25519 key.
pub struct DerivedEd25519Key {
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
    pub derivation_path: String,
}

impl Drop for DerivedEd25519Key {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Derive an Ed25519 payment key from a seed using SLIP-0010.
pub fn derive_ed25519_key(
    seed: &[u8],
    account: u32,
    index: u32,
) -> Result<DerivedEd25519Key, ChainingError> {
    if account >= HARDENED || index >= HARDENED {
        return Err(ChainingError::KeyDerivation(format!(
            "account {account} / index {index} must be below 2^31"
        )));
    }

    // Master key: HMAC-SHA512(key="ed25519 seed", data=seed)
    let mut mac = HmacSha512::new_from_slice(b"ed25519 seed")
        .map_err(|e| ChainingError::KeyDerivation(e.to_string()))?;
    mac.update(seed);
    let result = mac.finalize().into_bytes();

    let mut key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&result[..32]);
    chain_code.copy_from_slice(&result[32..]);

    for child_index in [PURPOSE, COIN_TYPE, account, 0, index] {
        let mut mac = HmacSha512::new_from_slice(&chain_code)
            .map_err(|e| ChainingError::KeyDerivation(e.to_string()))?;
        // Hardened child: 0x00 || key || index (with hardened bit set)
        mac.update(&[0x00]);
        mac.update(&key);
        mac.update(&(child_index | HARDENED).to_be_bytes());
        let result = mac.finalize().into_bytes();

        key.copy_from_slice(&result[..32]);
        chain_code.copy_from_slice(&result[32..]);
    }

    let signing_key = ed25519_dalek::SigningKey::from_bytes(&key);
    let derived = DerivedEd25519Key {
        private_key: key,
        public_key: signing_key.verifying_key().to_bytes(),
        derivation_path: derivation_path(account, index),
    };

    key.zeroize();
    chain_code.zeroize();

    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    // BIP-39 test vector: "abandon" x11 + "about"
    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_seed() -> Vec<u8> {
        mnemonic_to_seed(TEST_MNEMONIC, "").unwrap()
    }

    #[test]
    fn seed_is_64_bytes() {
        assert_eq!(test_seed().len(), 64);
    }

    #[test]
    fn passphrase_changes_seed() {
        let plain = mnemonic_to_seed(TEST_MNEMONIC, "").unwrap();
        let salted = mnemonic_to_seed(TEST_MNEMONIC, "TREZOR").unwrap();
        assert_ne!(plain, salted);
    }

    #[test]
    fn invalid_mnemonic_rejected() {
        let err = mnemonic_to_seed("abandon abandon abandon", "").unwrap_err();
        assert!(matches!(err, ChainingError::InvalidMnemonic(_)));
    }

    #[test]
    fn generated_mnemonic_has_24_words_and_parses() {
        let phrase = generate_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
        assert!(mnemonic_to_seed(&phrase, "").is_ok());
    }

    #[test]
    fn path_is_fully_hardened() {
        let key = derive_ed25519_key(&test_seed(), 0, 0).unwrap();
        assert_eq!(key.derivation_path, "m/1852'/1815'/0'/0'/0'");
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = test_seed();
        let a = derive_ed25519_key(&seed, 0, 0).unwrap();
        let b = derive_ed25519_key(&seed, 0, 0).unwrap();
        assert_eq!(a.private_key, b.private_key);
        assert_eq!(a.public_key, b.public_key);
    }

    #[test]
    fn accounts_and_indices_give_different_keys() {
        let seed = test_seed();
        let base = derive_ed25519_key(&seed, 0, 0).unwrap();
        let other_account = derive_ed25519_key(&seed, 1, 0).unwrap();
        let other_index = derive_ed25519_key(&seed, 0, 1).unwrap();
        assert_ne!(base.public_key, other_account.public_key);
        assert_ne!(base.public_key, other_index.public_key);
    }

    #[test]
    fn public_key_matches_private_key() {
        let key = derive_ed25519_key(&test_seed(), 0, 0).unwrap();
        let signing = ed25519_dalek::SigningKey::from_bytes(&key.private_key);
        assert_eq!(signing.verifying_key().to_bytes(), key.public_key);
    }

    #[test]
    fn out_of_range_index_rejected() {
        assert!(derive_ed25519_key(&test_seed(), 0, HARDENED).is_err());
    }
}
