use thiserror::Error;

use crate::asset::AssetId;
use crate::identity::PoolId;

/// Engine-wide error types for Cistern.
///
/// Every variant is raised before any state is mutated, so an `Err` always
/// means the operation had no effect.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CisternError {
    /// A deposit, withdrawal, or split amount is zero or otherwise ill-shaped.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// More shares were referenced than are outstanding.
    #[error("Insufficient shares: requested {requested} but only {outstanding} outstanding")]
    InsufficientShares { requested: u64, outstanding: u64 },

    /// Share tokens (or a token and a pool) belong to different pools.
    #[error("Pool mismatch: expected pool {expected}, found {found}")]
    PoolMismatch { expected: PoolId, found: PoolId },

    /// Registry already holds a pool with this name.
    #[error("Duplicate pool name: {0}")]
    DuplicatePoolName(String),

    /// Caller lacks the capability or role the operation requires.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No pool is registered under this name.
    #[error("Pool not found: {0}")]
    PoolNotFound(String),

    /// A balance was offered for a reserve slot holding a different asset.
    #[error("Asset mismatch: expected {expected}, found {found}")]
    AssetMismatch { expected: AssetId, found: AssetId },

    /// Pool parameters rejected at creation.
    #[error("Invalid pool: {0}")]
    InvalidPool(String),

    /// Overflow or division by zero in proportional math.
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// Accounting state no longer satisfies the pool invariants.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Cryptographic error (key decoding, signing, verification).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CisternError {
    fn from(e: serde_json::Error) -> Self {
        CisternError::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for CisternError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        CisternError::Crypto(e.to_string())
    }
}

impl From<hex::FromHexError> for CisternError {
    fn from(e: hex::FromHexError) -> Self {
        CisternError::Serialization(format!("invalid hex: {}", e))
    }
}
