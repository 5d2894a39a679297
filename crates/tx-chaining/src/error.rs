use chain_ada::AdaError;
use thiserror::Error;

use crate::slot::Slot;

/// Failures reported by a wallet provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Wallet is not connected")]
    Disconnected,

    #[error("Request rejected by wallet: {0}")]
    Rejected(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Wallet error: {0}")]
    Other(String),
}

/// Errors surfaced by the chained-transaction orchestrator.
#[derive(Debug, Error)]
pub enum ChainingError {
    #[error("No wallet account is connected")]
    WalletNotConnected,

    #[error("Parent transaction not yet signed")]
    ParentNotSigned,

    #[error("Transaction slot '{0}' has not been signed")]
    SlotNotSigned(Slot),

    #[error("Transaction slot '{0}' was already submitted")]
    SlotAlreadySubmitted(Slot),

    #[error("Transaction build failed: {0}")]
    Build(#[source] AdaError),

    #[error("Transaction hash failed: {0}")]
    Hash(#[source] AdaError),

    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Wallet provider error: {0}")]
    Provider(String),

    #[error("Wallet call '{operation}' timed out after {secs}s")]
    WalletTimeout { operation: &'static str, secs: u64 },

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}

impl From<ProviderError> for ChainingError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Disconnected => ChainingError::WalletNotConnected,
            ProviderError::Rejected(msg) => ChainingError::SigningRejected(msg),
            ProviderError::Submission(msg) => ChainingError::SubmissionRejected(msg),
            ProviderError::Other(msg) => ChainingError::Provider(msg),
        }
    }
}

impl From<AdaError> for ChainingError {
    fn from(e: AdaError) -> Self {
        ChainingError::Build(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_kinds() {
        assert!(matches!(
            ChainingError::from(ProviderError::Disconnected),
            ChainingError::WalletNotConnected
        ));
        assert!(matches!(
            ChainingError::from(ProviderError::Rejected("user declined".into())),
            ChainingError::SigningRejected(_)
        ));
        assert!(matches!(
            ChainingError::from(ProviderError::Submission("bad input".into())),
            ChainingError::SubmissionRejected(_)
        ));
        assert!(matches!(
            ChainingError::from(ProviderError::Other("io".into())),
            ChainingError::Provider(_)
        ));
    }

    #[test]
    fn build_errors_keep_source() {
        let err = ChainingError::from(AdaError::InvalidTxHash("empty transaction hash".into()));
        assert_eq!(
            err.to_string(),
            "Transaction build failed: invalid transaction hash: empty transaction hash"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn slot_errors_name_the_slot() {
        assert_eq!(
            ChainingError::SlotNotSigned(Slot::Second).to_string(),
            "Transaction slot 'second' has not been signed"
        );
        assert_eq!(
            ChainingError::SlotAlreadySubmitted(Slot::First).to_string(),
            "Transaction slot 'first' was already submitted"
        );
    }

    #[test]
    fn timeout_message() {
        let err = ChainingError::WalletTimeout {
            operation: "sign_tx",
            secs: 30,
        };
        assert_eq!(err.to_string(), "Wallet call 'sign_tx' timed out after 30s");
    }
}
