// crates/cistern-core/src/identity.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::crypto::hash_bytes;
use crate::error::CisternError;

/// Identity of a caller acting on the engine.
///
/// Holds 32 bytes: either an ed25519 public key, or the SHA-256 digest of a
/// human label for hosts that identify users by name (chat handles, test
/// fixtures). Serialized as lowercase hex so it can key JSON maps.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Principal([u8; 32]);

impl Principal {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a principal from a free-form label (SHA-256 of the UTF-8 bytes).
    pub fn from_label(label: &str) -> Self {
        Self(hash_bytes(label.as_bytes()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short form used in logs: the first 8 hex characters.
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.short())
    }
}

impl FromStr for Principal {
    type Err = CisternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            CisternError::Serialization("principal must be exactly 32 bytes".to_string())
        })?;
        Ok(Self(array))
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.to_hex()
    }
}

impl TryFrom<String> for Principal {
    type Error = CisternError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Stable unique identifier of a pool, assigned once at creation.
///
/// UUIDv7 values are time-ordered, so ids sort in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(Uuid);

impl PoolId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID (e.g. one read back from storage).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
