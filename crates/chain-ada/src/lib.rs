//! Cardano chain support for the transaction-chaining workspace.
//!
//! Provides key-hash enterprise addresses, funding records, a declarative
//! transaction builder with largest-first input selection and linear fees,
//! Ed25519 vkey witnesses and blake2b-256 transaction ids.
//!
//! Payloads are encoded with a small hand-written CBOR codec (`cbor`) instead
//! of a full serialization library; only the handful of shapes a payment
//! transaction needs are supported.

pub mod address;
pub mod asset;
pub mod cbor;
pub mod error;
pub mod hash;
pub mod network;
pub mod transaction;
pub mod utxo;

pub use address::{validate_address, Address};
pub use asset::{lovelace_of, Asset, LOVELACE};
pub use error::AdaError;
pub use network::{explorer_tx_url, AdaNetwork};
pub use transaction::{
    sign_transaction, tx_hash, FeeParams, Transaction, TxBody, TxBuilder, TxHash, TxInput,
    TxOutput, VkeyWitness, MIN_UTXO_LOVELACE,
};
pub use utxo::Utxo;
