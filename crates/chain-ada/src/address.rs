//! Cardano enterprise address derivation and validation.
//!
//! An enterprise address carries only a payment credential (no staking part):
//!
//! ```text
//! byte 0      header: 0b0110_nnnn  (type 6 = key-hash enterprise, n = network id)
//! bytes 1..29 blake2b-224(ed25519 verification key)
//! ```
//!
//! The textual form is Bech32 (not Bech32m) with prefix `addr` on mainnet and
//! `addr_test` on the test networks.

use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};

use crate::error::AdaError;
use crate::hash::blake2b_224;
use crate::network::AdaNetwork;

/// Header type nibble for an enterprise address with a key-hash credential.
const ENTERPRISE_KEY_HASH: u8 = 0b0110;

/// Length of a payment key hash.
pub const KEY_HASH_LEN: usize = 28;

/// Serialized length of an enterprise address.
pub const ENTERPRISE_ADDRESS_LEN: usize = 1 + KEY_HASH_LEN;

/// A key-hash enterprise address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    network_id: u8,
    payment_key_hash: [u8; KEY_HASH_LEN],
}

impl Address {
    pub fn new(network: AdaNetwork, payment_key_hash: [u8; KEY_HASH_LEN]) -> Self {
        Self {
            network_id: network.network_id(),
            payment_key_hash,
        }
    }

    /// Derive the enterprise address of a 32-byte Ed25519 verification key.
    pub fn from_verifying_key(vkey: &[u8; 32], network: AdaNetwork) -> Self {
        Self::new(network, blake2b_224(vkey))
    }

    pub fn network_id(&self) -> u8 {
        self.network_id
    }

    pub fn payment_key_hash(&self) -> &[u8; KEY_HASH_LEN] {
        &self.payment_key_hash
    }

    pub fn is_mainnet(&self) -> bool {
        self.network_id == AdaNetwork::Mainnet.network_id()
    }

    /// Raw address bytes as they appear in transaction outputs.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENTERPRISE_ADDRESS_LEN);
        out.push((ENTERPRISE_KEY_HASH << 4) | (self.network_id & 0x0f));
        out.extend_from_slice(&self.payment_key_hash);
        out
    }

    /// Parse raw address bytes. Only key-hash enterprise addresses are accepted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AdaError> {
        let (&header, hash) = bytes
            .split_first()
            .ok_or_else(|| AdaError::InvalidAddress("empty address".into()))?;

        if header >> 4 != ENTERPRISE_KEY_HASH {
            return Err(AdaError::InvalidAddress(format!(
                "unsupported address type {} (only key-hash enterprise addresses)",
                header >> 4
            )));
        }

        let payment_key_hash: [u8; KEY_HASH_LEN] = hash.try_into().map_err(|_| {
            AdaError::InvalidAddress(format!(
                "expected {ENTERPRISE_ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;

        Ok(Self {
            network_id: header & 0x0f,
            payment_key_hash,
        })
    }

    /// Bech32 text form.
    pub fn to_bech32(&self) -> String {
        let hrp = if self.is_mainnet() {
            AdaNetwork::Mainnet.address_hrp()
        } else {
            AdaNetwork::Preprod.address_hrp()
        };
        // Both prefixes are valid HRPs and the payload is far below the code length limit.
        let hrp = Hrp::parse_unchecked(hrp);
        bech32::encode::<Bech32>(hrp, &self.to_bytes())
            .unwrap_or_else(|_| unreachable!("29-byte payload always fits"))
    }

    /// Whether this address belongs to `network`.
    pub fn is_on(&self, network: AdaNetwork) -> bool {
        self.network_id == network.network_id()
    }
}

impl FromStr for Address {
    type Err = AdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, data) = bech32::decode(s)
            .map_err(|e| AdaError::InvalidAddress(format!("bech32 decode failed: {e}")))?;

        let address = Self::from_bytes(&data)?;

        let expected = if address.is_mainnet() {
            AdaNetwork::Mainnet.address_hrp()
        } else {
            AdaNetwork::Preprod.address_hrp()
        };
        if hrp.to_lowercase() != expected {
            return Err(AdaError::InvalidAddress(format!(
                "prefix '{}' does not match network id {}",
                hrp.to_lowercase(),
                address.network_id
            )));
        }

        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl TryFrom<String> for Address {
    type Error = AdaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_bech32()
    }
}

/// Validate a bech32 address string for the given network.
pub fn validate_address(address: &str, network: AdaNetwork) -> Result<bool, AdaError> {
    let parsed: Address = address.parse()?;
    if !parsed.is_on(network) {
        return Err(AdaError::InvalidAddress(format!(
            "address belongs to network id {}, expected {} ({network})",
            parsed.network_id,
            network.network_id()
        )));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vkey() -> [u8; 32] {
        let mut vkey = [0u8; 32];
        for (i, b) in vkey.iter_mut().enumerate() {
            *b = i as u8;
        }
        vkey
    }

    #[test]
    fn testnet_address_has_test_prefix() {
        let addr = Address::from_verifying_key(&sample_vkey(), AdaNetwork::Preprod);
        assert!(addr.to_bech32().starts_with("addr_test1"));
        assert_eq!(addr.to_bytes()[0], 0x60);
    }

    #[test]
    fn mainnet_address_has_plain_prefix() {
        let addr = Address::from_verifying_key(&sample_vkey(), AdaNetwork::Mainnet);
        let text = addr.to_bech32();
        assert!(text.starts_with("addr1"));
        assert_eq!(addr.to_bytes()[0], 0x61);
    }

    #[test]
    fn bech32_roundtrip() {
        let addr = Address::from_verifying_key(&sample_vkey(), AdaNetwork::Preview);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn key_hash_is_blake2b_224_of_vkey() {
        let vkey = sample_vkey();
        let addr = Address::from_verifying_key(&vkey, AdaNetwork::Preprod);
        assert_eq!(addr.payment_key_hash(), &blake2b_224(&vkey));
    }

    #[test]
    fn from_bytes_rejects_base_address_header() {
        let mut bytes = vec![0x00];
        bytes.extend_from_slice(&[0u8; 56]);
        let err = Address::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported address type"));
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let bytes = vec![0x60, 0x01, 0x02];
        assert!(Address::from_bytes(&bytes).is_err());
        assert!(Address::from_bytes(&[]).is_err());
    }

    #[test]
    fn garbage_string_is_rejected() {
        assert!("not_an_address".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn validate_checks_network() {
        let addr = Address::from_verifying_key(&sample_vkey(), AdaNetwork::Preprod).to_string();
        assert!(validate_address(&addr, AdaNetwork::Preprod).unwrap());
        assert!(validate_address(&addr, AdaNetwork::Preview).unwrap());
        assert!(validate_address(&addr, AdaNetwork::Mainnet).is_err());
    }

    #[test]
    fn serde_uses_bech32_string() {
        let addr = Address::from_verifying_key(&sample_vkey(), AdaNetwork::Preprod);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
