use serde::{Deserialize, Serialize};

use crate::error::AdaError;

/// Unit name of the native coin (1 ADA = 1,000,000 lovelace).
pub const LOVELACE: &str = "lovelace";

/// One entry of an amount list: a unit and a quantity of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub unit: String,
    pub quantity: u64,
}

impl Asset {
    pub fn new(unit: impl Into<String>, quantity: u64) -> Self {
        Self {
            unit: unit.into(),
            quantity,
        }
    }

    pub fn lovelace(quantity: u64) -> Self {
        Self::new(LOVELACE, quantity)
    }

    pub fn is_lovelace(&self) -> bool {
        self.unit == LOVELACE
    }
}

/// Total lovelace in an amount list.
///
/// Only the native coin is supported; any other unit is an error.
pub fn lovelace_of(amount: &[Asset]) -> Result<u64, AdaError> {
    amount.iter().try_fold(0u64, |acc, asset| {
        if !asset.is_lovelace() {
            return Err(AdaError::UnsupportedAsset(asset.unit.clone()));
        }
        acc.checked_add(asset.quantity)
            .ok_or_else(|| AdaError::TransactionBuildError("lovelace amount overflows u64".into()))
    })
}
