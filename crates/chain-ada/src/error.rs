use thiserror::Error;

/// Cardano chain operation errors.
#[derive(Debug, Error)]
pub enum AdaError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("unsupported asset unit: {0}")]
    UnsupportedAsset(String),

    #[error("insufficient funds: need {needed} lovelace, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("cbor error: {0}")]
    Cbor(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),
}
