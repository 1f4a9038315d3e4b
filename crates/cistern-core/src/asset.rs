// crates/cistern-core/src/asset.rs
//
// Fungible reserve assets custodied by pools.
//
// An `AssetId` names an asset (a ticker such as "SUI" or "USDC"); a `Balance`
// is a quantity of one asset in its smallest indivisible unit. All accounting
// is integer-only; there is no decimal scaling inside the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CisternError;

/// Symbol naming a reserve asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create an asset id. Symbols are trimmed and upper-cased so that
    /// "sui" and "SUI" name the same reserve.
    pub fn new(symbol: &str) -> Result<Self, CisternError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(CisternError::InvalidPool(
                "asset symbol must not be empty".to_string(),
            ));
        }
        Ok(Self(symbol.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A quantity of one asset.
///
/// Not `Clone`: a balance is value in custody, moved between wallets and
/// pools rather than copied. Hosts bring value into the engine with
/// [`Balance::new`]; everything else is `join`/`split`.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    asset: AssetId,
    value: u64,
}

impl Balance {
    /// Bring `value` units of `asset` into existence (host ingress, or a
    /// test-context mint).
    pub fn new(asset: AssetId, value: u64) -> Self {
        Self { asset, value }
    }

    /// An empty balance of `asset`.
    pub fn zero(asset: AssetId) -> Self {
        Self { asset, value: 0 }
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Absorb `other` into this balance.
    ///
    /// # Errors
    /// `AssetMismatch` if the assets differ; `Arithmetic` on u64 overflow.
    /// On error neither balance is modified.
    pub fn join(&mut self, other: Balance) -> Result<(), CisternError> {
        if other.asset != self.asset {
            return Err(CisternError::AssetMismatch {
                expected: self.asset.clone(),
                found: other.asset,
            });
        }
        self.value = self.value.checked_add(other.value).ok_or_else(|| {
            CisternError::Arithmetic(format!(
                "{} + {} overflows a {} balance",
                self.value, other.value, self.asset
            ))
        })?;
        Ok(())
    }

    /// Take `amount` out of this balance as a new balance of the same asset.
    ///
    /// # Errors
    /// `InvalidAmount` if `amount` exceeds the current value.
    pub fn split(&mut self, amount: u64) -> Result<Balance, CisternError> {
        if amount > self.value {
            return Err(CisternError::InvalidAmount(format!(
                "cannot split {} {} from a balance of {}",
                amount, self.asset, self.value
            )));
        }
        self.value -= amount;
        Ok(Balance {
            asset: self.asset.clone(),
            value: amount,
        })
    }

    /// Consume the balance, returning its raw value.
    pub fn into_value(self) -> u64 {
        self.value
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.asset)
    }
}
