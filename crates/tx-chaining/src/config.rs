//! Orchestrator configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file (or
//! no file at all) yields a working preprod setup.
//!
//! ```toml
//! network = "preprod"
//! chain_amount_lovelace = 10000000
//! submit_mode = "strict"
//! wallet_timeout_secs = 120
//! log_level = "info"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use chain_ada::{AdaNetwork, FeeParams, MIN_UTXO_LOVELACE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Amount the first transaction pays to the account (10 ADA).
pub const DEFAULT_CHAIN_AMOUNT_LOVELACE: u64 = 10_000_000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// How a confirmation id that differs from the local id is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    /// A mismatch leaves the slot `Signed`.
    #[default]
    Strict,
    /// A mismatch is logged and the slot is still marked `Submitted`.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainingConfig {
    pub network: AdaNetwork,

    /// Value of output 0 of the first transaction, spent by the second.
    pub chain_amount_lovelace: u64,

    pub submit_mode: SubmitMode,

    /// Upper bound for each wallet call. 0 disables the timeout.
    pub wallet_timeout_secs: u64,

    /// Explorer base URL; the network default is used when unset.
    pub explorer_base_url: Option<String>,

    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,

    pub min_fee_a: u64,
    pub min_fee_b: u64,
}

impl Default for ChainingConfig {
    fn default() -> Self {
        let fees = FeeParams::default();
        Self {
            network: AdaNetwork::default(),
            chain_amount_lovelace: DEFAULT_CHAIN_AMOUNT_LOVELACE,
            submit_mode: SubmitMode::default(),
            wallet_timeout_secs: 120,
            explorer_base_url: None,
            log_level: "info".to_string(),
            min_fee_a: fees.min_fee_a,
            min_fee_b: fees.min_fee_b,
        }
    }
}

impl ChainingConfig {
    pub fn fee_params(&self) -> FeeParams {
        FeeParams {
            min_fee_a: self.min_fee_a,
            min_fee_b: self.min_fee_b,
        }
    }

    pub fn wallet_timeout(&self) -> Option<Duration> {
        (self.wallet_timeout_secs > 0).then(|| Duration::from_secs(self.wallet_timeout_secs))
    }

    pub fn explorer_base_url(&self) -> &str {
        self.explorer_base_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_explorer_url())
    }

    /// Semantic checks serde cannot express. Reports every problem, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.chain_amount_lovelace < MIN_UTXO_LOVELACE {
            errors.push(format!(
                "chain_amount_lovelace must be at least {MIN_UTXO_LOVELACE}, got {}",
                self.chain_amount_lovelace
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        if let Some(url) = &self.explorer_base_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                errors.push(format!("explorer_base_url must be an http(s) URL, got '{url}'"));
            }
        }

        if self.min_fee_b == 0 && self.min_fee_a == 0 {
            errors.push("min_fee_a and min_fee_b cannot both be zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ChainingConfig, ConfigError> {
    let config: ChainingConfig = toml::from_str(content)?;
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ChainingConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
