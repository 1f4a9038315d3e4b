// crates/cistern-pool/src/snapshot.rs
//
// Plain-data persistence form of a registry and the share tokens held
// against it.
//
// Live engine values (`PoolRegistry`, `Pool`, `ShareToken`) cannot be
// deserialized: a token materialized from bytes would bypass `Pool::deposit`
// and break the rule that live tokens sum to each pool's `total_shares`.
// Hosts persist these records instead and rebuild live values through
// `PoolRegistry::restore`, which audits the whole set before minting any
// token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cistern_core::identity::{PoolId, Principal};

use crate::pool::{DepositPolicy, Reserve};
use crate::registry::RegistryConfig;

/// A held share claim, as persisted: which pool, how many shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub pool_id: PoolId,
    pub amount: u64,
}

/// One pool's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub id: PoolId,
    pub name: String,
    pub admin: Principal,
    pub reserves: Vec<Reserve>,
    pub total_shares: u64,
    pub deposit_policy: DepositPolicy,
    pub created_at: DateTime<Utc>,
}

/// A registry's persisted state.
///
/// `authority` is trusted as stored: whoever can rewrite the snapshot can
/// rewrite the registry, so hosts keep it where only they can write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub id: Uuid,
    pub authority: Principal,
    pub config: RegistryConfig,
    pub pools: Vec<PoolRecord>,
}
