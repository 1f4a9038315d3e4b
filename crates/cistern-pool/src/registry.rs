// crates/cistern-pool/src/registry.rs
//
// The namespace of pools.
//
// Pool names are unique within a registry and the registry is append-only:
// pools are never renamed or removed. Creating a pool, or reassigning a
// pool's admin from above, requires the registry's `AdminCapability`.
// Deposits and withdrawals need no privilege and go straight to the pool
// returned by `pool_mut`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use cistern_core::crypto::verify_signature;
use cistern_core::error::CisternError;
use cistern_core::identity::{PoolId, Principal};

use crate::capability::{challenge, AdminCapability};
use crate::pool::{DepositPolicy, Pool, PoolKind};
use crate::share::ShareToken;
use crate::snapshot::{RegistrySnapshot, ShareRecord};

/// Registry-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Deposit policy given to newly created dual-asset pools.
    #[serde(default)]
    pub default_deposit_policy: DepositPolicy,
}

/// All pools known to one deployment, keyed by name.
///
/// Not deserializable; see [`PoolRegistry::snapshot`] and
/// [`PoolRegistry::restore`].
#[derive(Debug)]
pub struct PoolRegistry {
    id: Uuid,
    /// Public key of the capability allowed to mutate the registry.
    authority: Principal,
    config: RegistryConfig,
    pools: BTreeMap<String, Pool>,
}

impl PoolRegistry {
    /// Initialize an empty registry and issue its one capability.
    pub fn new(config: RegistryConfig) -> (Self, AdminCapability) {
        let id = Uuid::now_v7();
        let cap = AdminCapability::issue(id);
        let registry = Self {
            id,
            authority: Principal::from_bytes(cap.public_key()),
            config,
            pools: BTreeMap::new(),
        };
        tracing::info!(registry = %id, "Pool registry initialized");
        (registry, cap)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Check that `cap` is this registry's capability.
    ///
    /// # Errors
    /// `Unauthorized` if the capability was issued for another registry or
    /// its proof does not verify against the recorded authority key.
    pub fn authorize(&self, cap: &AdminCapability) -> Result<(), CisternError> {
        if cap.registry_id() != self.id {
            tracing::warn!(registry = %self.id, presented = %cap.registry_id(), "Capability for another registry");
            return Err(CisternError::Unauthorized(format!(
                "capability was issued for registry {}, not {}",
                cap.registry_id(),
                self.id
            )));
        }
        let valid = verify_signature(self.authority.as_bytes(), &challenge(&self.id), &cap.prove())?;
        if !valid {
            tracing::warn!(registry = %self.id, "Capability proof rejected");
            return Err(CisternError::Unauthorized(
                "capability proof does not match the registry authority".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a new Empty pool named `name`.
    ///
    /// `admin` defaults to `caller`, so the capability holder can either
    /// administer the pool themselves or delegate it at creation time.
    ///
    /// # Errors
    /// - `Unauthorized`: `cap` is not this registry's capability.
    /// - `InvalidPool`: empty name, or a dual-asset pool with one asset twice.
    /// - `DuplicatePoolName`: the name is already registered.
    pub fn create_pool(
        &mut self,
        cap: &AdminCapability,
        caller: &Principal,
        name: &str,
        kind: PoolKind,
        admin: Option<Principal>,
    ) -> Result<PoolId, CisternError> {
        self.authorize(cap)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(CisternError::InvalidPool("pool name must not be empty".to_string()));
        }
        kind.validate()?;
        if self.pools.contains_key(name) {
            return Err(CisternError::DuplicatePoolName(name.to_string()));
        }

        let id = PoolId::generate();
        let admin = admin.unwrap_or(*caller);
        let pool = Pool::new(
            id,
            name.to_string(),
            &kind,
            admin,
            self.config.default_deposit_policy,
        );
        self.pools.insert(name.to_string(), pool);

        tracing::info!(
            pool = name,
            %id,
            slots = kind.slot_count(),
            admin = %admin.short(),
            "Pool created"
        );
        Ok(id)
    }

    /// Reassign the admin of pool `name`, authorized by the capability
    /// rather than by the pool's current admin.
    pub fn set_pool_admin(
        &mut self,
        cap: &AdminCapability,
        name: &str,
        new_admin: Principal,
    ) -> Result<(), CisternError> {
        self.authorize(cap)?;
        self.pool_mut(name)?.assign_admin(new_admin);
        Ok(())
    }

    pub fn pool_exists(&self, name: &str) -> bool {
        self.pools.contains_key(name.trim())
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Look up a pool by name. Surrounding whitespace is ignored, as in
    /// `create_pool`.
    pub fn pool(&self, name: &str) -> Result<&Pool, CisternError> {
        self.pools
            .get(name.trim())
            .ok_or_else(|| CisternError::PoolNotFound(name.to_string()))
    }

    /// Look up a pool by name for deposit/withdraw.
    pub fn pool_mut(&mut self, name: &str) -> Result<&mut Pool, CisternError> {
        self.pools
            .get_mut(name.trim())
            .ok_or_else(|| CisternError::PoolNotFound(name.to_string()))
    }

    /// Look up a pool by id (linear scan; registries are small).
    pub fn pool_by_id(&self, id: PoolId) -> Option<&Pool> {
        self.pools.values().find(|p| p.id() == id)
    }

    /// All pools in name order.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Persistable form of the registry. Pair it with the
    /// [`ShareToken::record`]s of every live token.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            id: self.id,
            authority: self.authority,
            config: self.config.clone(),
            pools: self.pools.values().map(Pool::to_record).collect(),
        }
    }

    /// Rebuild a registry and its live share tokens from persisted records.
    ///
    /// Tokens are returned in the order of `records`. None is minted unless
    /// the whole set passes: every pool satisfies its invariants, names and
    /// ids are unique, every record is positive and names a known pool, and
    /// records sum to each pool's `total_shares`.
    ///
    /// # Errors
    /// `DuplicatePoolName`, or `InvariantViolation` for anything else that
    /// does not add up.
    pub fn restore(
        snapshot: RegistrySnapshot,
        records: &[ShareRecord],
    ) -> Result<(Self, Vec<ShareToken>), CisternError> {
        let mut pools = BTreeMap::new();
        let mut ids = HashSet::new();
        for record in snapshot.pools {
            let pool = Pool::from_record(record)?;
            if !ids.insert(pool.id()) {
                return Err(CisternError::InvariantViolation(format!(
                    "pool id {} is stored twice",
                    pool.id()
                )));
            }
            if pools.contains_key(pool.name()) {
                return Err(CisternError::DuplicatePoolName(pool.name().to_string()));
            }
            pools.insert(pool.name().to_string(), pool);
        }
        let registry = Self {
            id: snapshot.id,
            authority: snapshot.authority,
            config: snapshot.config,
            pools,
        };

        if let Some(record) = records.iter().find(|r| r.amount == 0) {
            return Err(CisternError::InvariantViolation(format!(
                "stored share record for pool {} is empty",
                record.pool_id
            )));
        }
        let tokens: Vec<ShareToken> = records
            .iter()
            .map(|r| ShareToken::mint(r.pool_id, r.amount))
            .collect();
        registry.audit(&tokens)?;

        tracing::debug!(
            registry = %registry.id,
            pools = registry.pools.len(),
            tokens = tokens.len(),
            "Pool registry restored"
        );
        Ok((registry, tokens))
    }

    /// Verify every pool's invariants and that `tokens` account for exactly
    /// each pool's outstanding shares.
    ///
    /// `tokens` must be every live share token the host holds.
    pub fn audit<'a, I>(&self, tokens: I) -> Result<(), CisternError>
    where
        I: IntoIterator<Item = &'a ShareToken>,
    {
        let mut held: HashMap<PoolId, u128> = HashMap::new();
        for token in tokens {
            *held.entry(token.pool_id()).or_default() += token.amount() as u128;
        }

        for (name, pool) in &self.pools {
            if name != pool.name() {
                return Err(CisternError::InvariantViolation(format!(
                    "pool {} is registered under the name {}",
                    pool.name(),
                    name
                )));
            }
            pool.check_invariants()?;

            let sum = held.remove(&pool.id()).unwrap_or(0);
            if sum != pool.total_shares() as u128 {
                return Err(CisternError::InvariantViolation(format!(
                    "pool {} has {} shares outstanding but tokens hold {}",
                    name,
                    pool.total_shares(),
                    sum
                )));
            }
        }

        if let Some((pool_id, sum)) = held.into_iter().find(|(_, sum)| *sum > 0) {
            return Err(CisternError::InvariantViolation(format!(
                "{} shares held against unknown pool {}",
                sum, pool_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cistern_core::asset::{AssetId, Balance};

    fn sui_kind() -> PoolKind {
        PoolKind::Single {
            base: AssetId::new("SUI").unwrap(),
        }
    }

    fn operator() -> Principal {
        Principal::from_label("operator")
    }

    #[test]
    fn test_create_pool() {
        let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
        let id = registry
            .create_pool(&cap, &operator(), "sui", sui_kind(), None)
            .unwrap();

        assert!(registry.pool_exists("sui"));
        assert_eq!(registry.pool_count(), 1);
        let pool = registry.pool("sui").unwrap();
        assert_eq!(pool.id(), id);
        assert_eq!(pool.admin(), &operator());
        assert_eq!(pool.total_shares(), 0);
        assert!(registry.pool_by_id(id).is_some());
    }

    #[test]
    fn test_delegated_admin() {
        let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
        let delegate = Principal::from_label("delegate");
        registry
            .create_pool(&cap, &operator(), "sui", sui_kind(), Some(delegate))
            .unwrap();
        assert_eq!(registry.pool("sui").unwrap().admin(), &delegate);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
        let first = registry
            .create_pool(&cap, &operator(), "sui", sui_kind(), None)
            .unwrap();
        registry
            .pool_mut("sui")
            .unwrap()
            .deposit(vec![Balance::new(AssetId::new("SUI").unwrap(), 10)])
            .unwrap();

        let err = registry
            .create_pool(&cap, &operator(), "sui", sui_kind(), None)
            .unwrap_err();
        assert_eq!(err, CisternError::DuplicatePoolName("sui".to_string()));

        let pool = registry.pool("sui").unwrap();
        assert_eq!(pool.id(), first);
        assert_eq!(pool.total_shares(), 10);
        assert_eq!(registry.pool_count(), 1);
    }

    #[test]
    fn test_foreign_capability_rejected() {
        let (mut registry, _cap) = PoolRegistry::new(RegistryConfig::default());
        let (_other, foreign) = PoolRegistry::new(RegistryConfig::default());
        let err = registry
            .create_pool(&foreign, &operator(), "sui", sui_kind(), None)
            .unwrap_err();
        assert!(matches!(err, CisternError::Unauthorized(_)));
        assert_eq!(registry.pool_count(), 0);
    }

    #[test]
    fn test_forged_capability_rejected() {
        let (mut registry, _cap) = PoolRegistry::new(RegistryConfig::default());
        // Right registry id, wrong key.
        let forged = AdminCapability::import(registry.id(), &"11".repeat(32)).unwrap();
        let err = registry
            .create_pool(&forged, &operator(), "sui", sui_kind(), None)
            .unwrap_err();
        assert!(matches!(err, CisternError::Unauthorized(_)));
    }

    #[test]
    fn test_invalid_pools_rejected() {
        let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
        assert!(matches!(
            registry.create_pool(&cap, &operator(), "  ", sui_kind(), None),
            Err(CisternError::InvalidPool(_))
        ));
        let same_twice = PoolKind::Pair {
            base: AssetId::new("SUI").unwrap(),
            paired: AssetId::new("sui").unwrap(),
        };
        assert!(matches!(
            registry.create_pool(&cap, &operator(), "bad", same_twice, None),
            Err(CisternError::InvalidPool(_))
        ));
        assert_eq!(registry.pool_count(), 0);
    }

    #[test]
    fn test_default_policy_applied() {
        let config = RegistryConfig {
            default_deposit_policy: DepositPolicy::Simultaneous,
        };
        let (mut registry, cap) = PoolRegistry::new(config);
        registry
            .create_pool(&cap, &operator(), "sui", sui_kind(), None)
            .unwrap();
        assert_eq!(
            registry.pool("sui").unwrap().deposit_policy(),
            DepositPolicy::Simultaneous
        );
    }

    #[test]
    fn test_set_pool_admin_requires_capability() {
        let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
        let (_other, foreign) = PoolRegistry::new(RegistryConfig::default());
        registry
            .create_pool(&cap, &operator(), "sui", sui_kind(), None)
            .unwrap();

        let carol = Principal::from_label("carol");
        assert!(registry.set_pool_admin(&foreign, "sui", carol).is_err());
        registry.set_pool_admin(&cap, "sui", carol).unwrap();
        assert_eq!(registry.pool("sui").unwrap().admin(), &carol);
        assert!(matches!(
            registry.set_pool_admin(&cap, "missing", carol),
            Err(CisternError::PoolNotFound(_))
        ));
    }

    #[test]
    fn test_missing_pool() {
        let (mut registry, _cap) = PoolRegistry::new(RegistryConfig::default());
        assert!(!registry.pool_exists("nope"));
        assert!(matches!(registry.pool("nope"), Err(CisternError::PoolNotFound(_))));
        assert!(matches!(registry.pool_mut("nope"), Err(CisternError::PoolNotFound(_))));
    }

    #[test]
    fn test_audit() {
        let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
        registry
            .create_pool(&cap, &operator(), "sui", sui_kind(), None)
            .unwrap();
        let sui = AssetId::new("SUI").unwrap();
        let pool = registry.pool_mut("sui").unwrap();
        let a = pool.deposit(vec![Balance::new(sui.clone(), 100)]).unwrap();
        let b = pool.deposit(vec![Balance::new(sui, 50)]).unwrap();

        assert!(registry.audit([&a, &b]).is_ok());
        assert!(matches!(
            registry.audit([&a]),
            Err(CisternError::InvariantViolation(_))
        ));
        let stray = ShareToken::zero(PoolId::generate());
        assert!(registry.audit([&a, &b, &stray]).is_ok());
    }

    fn funded_registry() -> (PoolRegistry, AdminCapability, Vec<ShareToken>) {
        let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
        registry
            .create_pool(&cap, &operator(), "sui", sui_kind(), None)
            .unwrap();
        let sui = AssetId::new("SUI").unwrap();
        let pool = registry.pool_mut("sui").unwrap();
        let a = pool.deposit(vec![Balance::new(sui.clone(), 100)]).unwrap();
        let b = pool.deposit(vec![Balance::new(sui, 50)]).unwrap();
        (registry, cap, vec![a, b])
    }

    #[test]
    fn test_snapshot_restore_keeps_authority() {
        let (registry, cap, tokens) = funded_registry();
        let records: Vec<ShareRecord> = tokens.iter().map(ShareToken::record).collect();

        let json = serde_json::to_string(&registry.snapshot()).unwrap();
        let snapshot: RegistrySnapshot = serde_json::from_str(&json).unwrap();
        let (mut restored, restored_tokens) = PoolRegistry::restore(snapshot, &records).unwrap();

        assert_eq!(restored.id(), registry.id());
        assert_eq!(restored.pool("sui").unwrap(), registry.pool("sui").unwrap());
        let amounts: Vec<u64> = restored_tokens.iter().map(ShareToken::amount).collect();
        assert_eq!(amounts, vec![100, 50]);
        restored
            .create_pool(&cap, &operator(), "sui-2", sui_kind(), None)
            .unwrap();
    }

    #[test]
    fn test_restore_rejects_extra_shares() {
        let (registry, _cap, tokens) = funded_registry();
        let mut records: Vec<ShareRecord> = tokens.iter().map(ShareToken::record).collect();
        // A copy of the first holder's claim.
        records.push(records[0].clone());
        assert!(matches!(
            PoolRegistry::restore(registry.snapshot(), &records),
            Err(CisternError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_restore_rejects_unknown_pool_and_empty_records() {
        let (registry, _cap, tokens) = funded_registry();
        let mut records: Vec<ShareRecord> = tokens.iter().map(ShareToken::record).collect();
        records.push(ShareRecord {
            pool_id: PoolId::generate(),
            amount: 5,
        });
        assert!(matches!(
            PoolRegistry::restore(registry.snapshot(), &records),
            Err(CisternError::InvariantViolation(_))
        ));

        let mut records: Vec<ShareRecord> = tokens.iter().map(ShareToken::record).collect();
        records.push(ShareRecord {
            pool_id: records[0].pool_id,
            amount: 0,
        });
        assert!(matches!(
            PoolRegistry::restore(registry.snapshot(), &records),
            Err(CisternError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_restore_rejects_duplicate_pools() {
        let (registry, _cap, tokens) = funded_registry();
        let records: Vec<ShareRecord> = tokens.iter().map(ShareToken::record).collect();

        let mut snapshot = registry.snapshot();
        let mut twin = snapshot.pools[0].clone();
        twin.id = PoolId::generate();
        snapshot.pools.push(twin);
        assert!(matches!(
            PoolRegistry::restore(snapshot, &records),
            Err(CisternError::DuplicatePoolName(_))
        ));

        let mut snapshot = registry.snapshot();
        let mut twin = snapshot.pools[0].clone();
        twin.name = "sui-copy".to_string();
        snapshot.pools.push(twin);
        assert!(matches!(
            PoolRegistry::restore(snapshot, &records),
            Err(CisternError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_lookups_ignore_surrounding_whitespace() {
        let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
        registry
            .create_pool(&cap, &operator(), " sui ", sui_kind(), None)
            .unwrap();
        assert!(registry.pool_exists(" sui "));
        assert!(registry.pool_exists("sui"));
        assert_eq!(registry.pool(" sui ").unwrap().name(), "sui");
        assert!(registry.pool_mut("sui ").is_ok());
        registry
            .set_pool_admin(&cap, " sui", Principal::from_label("carol"))
            .unwrap();
    }
}
