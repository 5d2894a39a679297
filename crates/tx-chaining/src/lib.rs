//! Chained-transaction orchestration.
//!
//! Builds and signs a transaction, builds and signs a second transaction that
//! spends output 0 of the first, then submits both back to back without
//! waiting for confirmation. Wallet access goes through [`WalletProvider`];
//! [`memory`] provides an in-process wallet and ledger.

pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod orchestrator;
pub mod provider;
pub mod slot;

pub use config::{load_config, parse_config, ChainingConfig, ConfigError, SubmitMode};
pub use error::{ChainingError, ProviderError};
pub use memory::{MemoryLedger, MemoryWallet};
pub use orchestrator::{ChainOrchestrator, SubmissionReport, SubmitOutcome};
pub use provider::{ConnectedAccount, WalletProvider};
pub use slot::{ChainSnapshot, SignedTx, Slot, SlotSnapshot, SlotState, SlotStatus};
