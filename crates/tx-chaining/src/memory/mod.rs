//! In-process wallet and ledger, used by the demo runner and integration tests.

pub mod keys;
pub mod ledger;
pub mod wallet;

pub use ledger::{LedgerError, MemoryLedger, SharedLedger};
pub use wallet::MemoryWallet;
