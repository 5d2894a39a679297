use serde::{Deserialize, Serialize};

use crate::error::AdaError;

/// Cardanoscan explorer for mainnet.
pub const MAINNET_EXPLORER: &str = "https://cardanoscan.io";

/// Cardanoscan explorer for the pre-production testnet.
pub const PREPROD_EXPLORER: &str = "https://preprod.cardanoscan.io";

/// Cardanoscan explorer for the preview testnet.
pub const PREVIEW_EXPLORER: &str = "https://preview.cardanoscan.io";

/// Supported Cardano networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdaNetwork {
    Mainnet,
    #[default]
    Preprod,
    Preview,
}

impl AdaNetwork {
    /// Network id carried in the low nibble of an address header byte.
    pub fn network_id(self) -> u8 {
        match self {
            AdaNetwork::Mainnet => 1,
            AdaNetwork::Preprod | AdaNetwork::Preview => 0,
        }
    }

    /// Bech32 human-readable prefix for payment addresses.
    pub fn address_hrp(self) -> &'static str {
        match self {
            AdaNetwork::Mainnet => "addr",
            AdaNetwork::Preprod | AdaNetwork::Preview => "addr_test",
        }
    }

    /// Default block explorer base URL for this network.
    pub fn default_explorer_url(self) -> &'static str {
        match self {
            AdaNetwork::Mainnet => MAINNET_EXPLORER,
            AdaNetwork::Preprod => PREPROD_EXPLORER,
            AdaNetwork::Preview => PREVIEW_EXPLORER,
        }
    }

    pub fn is_testnet(self) -> bool {
        self.network_id() == 0
    }
}

impl std::fmt::Display for AdaNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdaNetwork::Mainnet => write!(f, "mainnet"),
            AdaNetwork::Preprod => write!(f, "preprod"),
            AdaNetwork::Preview => write!(f, "preview"),
        }
    }
}

impl std::str::FromStr for AdaNetwork {
    type Err = AdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(AdaNetwork::Mainnet),
            "preprod" => Ok(AdaNetwork::Preprod),
            "preview" => Ok(AdaNetwork::Preview),
            other => Err(AdaError::InvalidNetwork(other.to_string())),
        }
    }
}

/// Explorer link for a transaction: `<base>/transaction/<hash>`.
pub fn explorer_tx_url(base_url: &str, tx_hash: &str) -> String {
    format!("{}/transaction/{}", base_url.trim_end_matches('/'), tx_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_ids() {
        assert_eq!(AdaNetwork::Mainnet.network_id(), 1);
        assert_eq!(AdaNetwork::Preprod.network_id(), 0);
        assert_eq!(AdaNetwork::Preview.network_id(), 0);
    }

    #[test]
    fn testnets_share_address_prefix() {
        assert_eq!(AdaNetwork::Mainnet.address_hrp(), "addr");
        assert_eq!(AdaNetwork::Preprod.address_hrp(), "addr_test");
        assert_eq!(AdaNetwork::Preview.address_hrp(), "addr_test");
        assert!(AdaNetwork::Preview.is_testnet());
        assert!(!AdaNetwork::Mainnet.is_testnet());
    }

    #[test]
    fn display_and_parse() {
        for net in [AdaNetwork::Mainnet, AdaNetwork::Preprod, AdaNetwork::Preview] {
            assert_eq!(net.to_string().parse::<AdaNetwork>().unwrap(), net);
        }
        assert!("PREPROD".parse::<AdaNetwork>().is_ok());
        assert!("testnet".parse::<AdaNetwork>().is_err());
    }

    #[test]
    fn default_is_preprod() {
        assert_eq!(AdaNetwork::default(), AdaNetwork::Preprod);
    }

    #[test]
    fn explorer_url_joins_without_double_slash() {
        let hash = "ab".repeat(32);
        assert_eq!(
            explorer_tx_url("https://preprod.cardanoscan.io/", &hash),
            format!("https://preprod.cardanoscan.io/transaction/{hash}")
        );
        assert_eq!(
            explorer_tx_url(AdaNetwork::Mainnet.default_explorer_url(), "00"),
            "https://cardanoscan.io/transaction/00"
        );
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&AdaNetwork::Preview).unwrap();
        assert_eq!(json, "\"preview\"");
        let back: AdaNetwork = serde_json::from_str("\"mainnet\"").unwrap();
        assert_eq!(back, AdaNetwork::Mainnet);
    }
}
