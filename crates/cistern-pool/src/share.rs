// crates/cistern-pool/src/share.rs
//
// Fungible ownership shares.
//
// A `ShareToken` is a claim on a proportional slice of one pool's reserves.
// Tokens are minted only by `Pool::deposit` and burned only by
// `Pool::withdraw`; holders may split and merge them freely. The sum of all
// live token amounts for a pool always equals that pool's `total_shares`,
// which is why the type is not `Clone`, not `Deserialize`, and has no
// public constructor for a non-zero amount.

use std::fmt;
use thiserror::Error;

use cistern_core::error::CisternError;
use cistern_core::identity::PoolId;

use crate::snapshot::ShareRecord;

/// Ownership units of a single pool.
///
/// Tokens cannot be read back from bytes; persist a [`ShareRecord`] and
/// rebuild through `PoolRegistry::restore`.
///
/// ```compile_fail
/// let forged: cistern_pool::ShareToken =
///     serde_json::from_str(r#"{"pool_id":"0190a6d2-0000-7000-8000-000000000000","amount":1}"#).unwrap();
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct ShareToken {
    pool_id: PoolId,
    amount: u64,
}

/// A failed operation that took a value by move, handing the value back.
///
/// Operations that consume tokens or balances (`merge`, `withdraw`,
/// `deposit`) return this so a rejected call never destroys what the caller
/// offered.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Refused<T: fmt::Debug> {
    pub error: CisternError,
    pub returned: T,
}

impl<T: fmt::Debug> Refused<T> {
    pub(crate) fn new(error: CisternError, returned: T) -> Self {
        Self { error, returned }
    }

    /// Split into the error and the returned value.
    pub fn into_parts(self) -> (CisternError, T) {
        (self.error, self.returned)
    }
}

impl<T: fmt::Debug> From<Refused<T>> for CisternError {
    fn from(r: Refused<T>) -> Self {
        r.error
    }
}

impl ShareToken {
    /// Mint a new token. Only pools mint, and only for positive amounts.
    pub(crate) fn mint(pool_id: PoolId, amount: u64) -> Self {
        debug_assert!(amount > 0, "minted share tokens must be non-empty");
        Self { pool_id, amount }
    }

    /// Destroy the token, returning the number of units it carried.
    pub(crate) fn burn(self) -> u64 {
        self.amount
    }

    /// An empty claim against `pool_id`. Carries no shares, so it never
    /// affects the pool's share accounting.
    pub fn zero(pool_id: PoolId) -> Self {
        Self { pool_id, amount: 0 }
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Persistable description of this token.
    pub fn record(&self) -> ShareRecord {
        ShareRecord {
            pool_id: self.pool_id,
            amount: self.amount,
        }
    }

    /// Move `amount` units out of this token into a new token.
    ///
    /// This token keeps the remainder. Both pieces are strictly positive.
    ///
    /// # Errors
    /// `InvalidAmount` if `amount == 0` or `amount >= self.amount()`.
    pub fn split(&mut self, amount: u64) -> Result<ShareToken, CisternError> {
        if amount == 0 || amount >= self.amount {
            return Err(CisternError::InvalidAmount(format!(
                "split amount {} must be strictly between 0 and {}",
                amount, self.amount
            )));
        }
        self.amount -= amount;
        Ok(ShareToken {
            pool_id: self.pool_id,
            amount,
        })
    }

    /// Absorb `other` into this token.
    ///
    /// # Errors
    /// `PoolMismatch` if the tokens belong to different pools; `other` is
    /// returned inside the error untouched.
    pub fn merge(&mut self, other: ShareToken) -> Result<(), Refused<ShareToken>> {
        if other.pool_id != self.pool_id {
            let error = CisternError::PoolMismatch {
                expected: self.pool_id,
                found: other.pool_id,
            };
            return Err(Refused::new(error, other));
        }
        match self.amount.checked_add(other.amount) {
            Some(sum) => {
                self.amount = sum;
                Ok(())
            }
            None => {
                let error = CisternError::Arithmetic(format!(
                    "merging {} into {} overflows the share range",
                    other.amount, self.amount
                ));
                Err(Refused::new(error, other))
            }
        }
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} shares of pool {}", self.amount, self.pool_id)
    }
}
