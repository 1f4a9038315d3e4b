// crates/cistern-pool/src/pool.rs
//
// A single liquidity pool: reserve balances plus the count of outstanding
// ownership shares.
//
// Pools come in two shapes sharing one model:
//   - single-asset: one reserve slot (the base asset);
//   - dual-asset: two slots (base + paired asset).
//
// Slot 0 is always the primary reserve. Minted shares are priced against the
// primary reserve only; a secondary deposit is added to its slot without
// influencing the mint. Redemption pays out every slot pro rata.
//
// States:
//   Empty  (total_shares == 0, every reserve 0)
//   Funded (total_shares  > 0, primary reserve > 0)
// A deposit into an Empty pool is the only Empty -> Funded edge (1:1 rate);
// burning the last share is the only Funded -> Empty edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use cistern_core::asset::{AssetId, Balance};
use cistern_core::error::CisternError;
use cistern_core::identity::{PoolId, Principal};

use crate::math::{asset_for_redemption, share_for_deposit};
use crate::share::{Refused, ShareToken};
use crate::snapshot::PoolRecord;

/// Which deposit shapes a dual-asset pool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepositPolicy {
    /// The primary amount is required, the secondary is optional.
    #[default]
    PrimaryOnly,
    /// Both amounts are required in every deposit.
    Simultaneous,
}

impl fmt::Display for DepositPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepositPolicy::PrimaryOnly => write!(f, "primary-only"),
            DepositPolicy::Simultaneous => write!(f, "simultaneous"),
        }
    }
}

impl FromStr for DepositPolicy {
    type Err = CisternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary-only" | "primary" => Ok(DepositPolicy::PrimaryOnly),
            "simultaneous" | "strict" => Ok(DepositPolicy::Simultaneous),
            other => Err(CisternError::InvalidPool(format!(
                "unknown deposit policy '{}' (expected primary-only or simultaneous)",
                other
            ))),
        }
    }
}

/// The assets a pool holds, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolKind {
    Single { base: AssetId },
    Pair { base: AssetId, paired: AssetId },
}

impl PoolKind {
    /// Asset of each reserve slot, primary first.
    pub fn assets(&self) -> Vec<AssetId> {
        match self {
            PoolKind::Single { base } => vec![base.clone()],
            PoolKind::Pair { base, paired } => vec![base.clone(), paired.clone()],
        }
    }

    pub fn slot_count(&self) -> usize {
        match self {
            PoolKind::Single { .. } => 1,
            PoolKind::Pair { .. } => 2,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), CisternError> {
        if let PoolKind::Pair { base, paired } = self {
            if base == paired {
                return Err(CisternError::InvalidPool(format!(
                    "a dual-asset pool needs two distinct assets, got {} twice",
                    base
                )));
            }
        }
        Ok(())
    }
}

/// One reserve slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    asset: AssetId,
    balance: u64,
}

impl Reserve {
    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }
}

/// Logical state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolState {
    Empty,
    Funded,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolState::Empty => write!(f, "Empty"),
            PoolState::Funded => write!(f, "Funded"),
        }
    }
}

/// Reserves and share accounting for one registered pool.
///
/// Fields are private: the only mutations are `deposit`, `withdraw`, and
/// the admin-gated setters. Serializable for display; rebuilt from storage
/// only through `PoolRegistry::restore`.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Pool {
    id: PoolId,
    name: String,
    admin: Principal,
    reserves: Vec<Reserve>,
    total_shares: u64,
    deposit_policy: DepositPolicy,
    created_at: DateTime<Utc>,
}

impl Pool {
    /// Create an Empty pool. Pools are only created through the registry.
    pub(crate) fn new(
        id: PoolId,
        name: String,
        kind: &PoolKind,
        admin: Principal,
        deposit_policy: DepositPolicy,
    ) -> Self {
        let reserves = kind
            .assets()
            .into_iter()
            .map(|asset| Reserve { asset, balance: 0 })
            .collect();
        Self {
            id,
            name,
            admin,
            reserves,
            total_shares: 0,
            deposit_policy,
            created_at: Utc::now(),
        }
    }

    /// Rebuild a pool from its persisted record, checking the invariants.
    pub(crate) fn from_record(record: PoolRecord) -> Result<Self, CisternError> {
        if record.name.is_empty() || record.name.trim() != record.name {
            return Err(CisternError::InvariantViolation(format!(
                "stored pool name {:?} is not a valid pool name",
                record.name
            )));
        }
        let pool = Self {
            id: record.id,
            name: record.name,
            admin: record.admin,
            reserves: record.reserves,
            total_shares: record.total_shares,
            deposit_policy: record.deposit_policy,
            created_at: record.created_at,
        };
        pool.check_invariants()?;
        Ok(pool)
    }

    pub(crate) fn to_record(&self) -> PoolRecord {
        PoolRecord {
            id: self.id,
            name: self.name.clone(),
            admin: self.admin,
            reserves: self.reserves.clone(),
            total_shares: self.total_shares,
            deposit_policy: self.deposit_policy,
            created_at: self.created_at,
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn admin(&self) -> &Principal {
        &self.admin
    }

    pub fn reserves(&self) -> &[Reserve] {
        &self.reserves
    }

    /// Balance of reserve `slot`, or `None` if the pool has no such slot.
    pub fn reserve(&self, slot: usize) -> Option<u64> {
        self.reserves.get(slot).map(|r| r.balance)
    }

    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    pub fn deposit_policy(&self) -> DepositPolicy {
        self.deposit_policy
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn kind(&self) -> PoolKind {
        match self.reserves.as_slice() {
            [base] => PoolKind::Single {
                base: base.asset.clone(),
            },
            [base, paired, ..] => PoolKind::Pair {
                base: base.asset.clone(),
                paired: paired.asset.clone(),
            },
            [] => unreachable!("pools always have a primary reserve"),
        }
    }

    pub fn state(&self) -> PoolState {
        if self.total_shares == 0 {
            PoolState::Empty
        } else {
            PoolState::Funded
        }
    }

    /// Deposit reserve assets and receive newly minted shares.
    ///
    /// `assets[i]` is credited to reserve slot `i`. Single-asset pools take
    /// exactly one balance. Dual-asset pools take one or two under
    /// `DepositPolicy::PrimaryOnly` and exactly two under
    /// `DepositPolicy::Simultaneous`. Shares are computed from the primary
    /// amount alone.
    ///
    /// # Errors
    /// - `InvalidAmount`: wrong number of balances, a zero balance, or a
    ///   deposit too small to mint a single share at the current ratio.
    /// - `AssetMismatch`: a balance offered for a slot of another asset.
    /// - `Arithmetic`: reserve or share count would overflow.
    ///
    /// On error the pool is unchanged and the balances are handed back.
    pub fn deposit(&mut self, assets: Vec<Balance>) -> Result<ShareToken, Refused<Vec<Balance>>> {
        match self.plan_deposit(&assets) {
            Ok((minted, new_reserves)) => {
                for (reserve, balance) in self.reserves.iter_mut().zip(new_reserves) {
                    reserve.balance = balance;
                }
                self.total_shares += minted;

                tracing::debug!(
                    pool = %self.name,
                    deposited = ?assets.iter().map(Balance::value).collect::<Vec<_>>(),
                    minted,
                    total_shares = self.total_shares,
                    "Deposit accepted"
                );
                Ok(ShareToken::mint(self.id, minted))
            }
            Err(error) => {
                tracing::debug!(pool = %self.name, %error, "Deposit rejected");
                Err(Refused::new(error, assets))
            }
        }
    }

    /// Validate a deposit and compute (minted shares, post-deposit reserves)
    /// without touching the pool.
    fn plan_deposit(&self, assets: &[Balance]) -> Result<(u64, Vec<u64>), CisternError> {
        let slots = self.reserves.len();
        let accepted = match (slots, self.deposit_policy) {
            (1, _) => 1..=1,
            (_, DepositPolicy::PrimaryOnly) => 1..=slots,
            (_, DepositPolicy::Simultaneous) => slots..=slots,
        };
        if !accepted.contains(&assets.len()) {
            return Err(CisternError::InvalidAmount(format!(
                "pool {} ({} policy) accepts {}..={} deposit amounts, got {}",
                self.name,
                self.deposit_policy,
                accepted.start(),
                accepted.end(),
                assets.len()
            )));
        }

        for (reserve, balance) in self.reserves.iter().zip(assets) {
            if balance.asset() != &reserve.asset {
                return Err(CisternError::AssetMismatch {
                    expected: reserve.asset.clone(),
                    found: balance.asset().clone(),
                });
            }
            if balance.is_zero() {
                return Err(CisternError::InvalidAmount(format!(
                    "deposit of {} must be greater than zero",
                    reserve.asset
                )));
            }
        }

        let primary = assets[0].value();
        let minted = share_for_deposit(primary, self.reserves[0].balance, self.total_shares)?;
        if minted == 0 {
            return Err(CisternError::InvalidAmount(format!(
                "deposit of {} {} is too small to mint a share ({} reserve, {} shares)",
                primary, self.reserves[0].asset, self.reserves[0].balance, self.total_shares
            )));
        }
        self.total_shares.checked_add(minted).ok_or_else(|| {
            CisternError::Arithmetic("total share count would overflow".to_string())
        })?;

        let mut new_reserves: Vec<u64> = self.reserves.iter().map(|r| r.balance).collect();
        for (slot, balance) in assets.iter().enumerate() {
            new_reserves[slot] = new_reserves[slot].checked_add(balance.value()).ok_or_else(|| {
                CisternError::Arithmetic(format!(
                    "{} reserve would overflow",
                    self.reserves[slot].asset
                ))
            })?;
        }

        Ok((minted, new_reserves))
    }

    /// Redeem a share token for its proportional slice of every reserve.
    ///
    /// Returns one balance per reserve slot, primary first; a slot with no
    /// reserve pays out a zero balance. Burning the last outstanding share
    /// pays out every reserve in full and leaves the pool Empty.
    ///
    /// # Errors
    /// - `PoolMismatch`: the token belongs to a different pool.
    /// - `InvalidAmount`: the token carries zero shares.
    /// - `InsufficientShares`: the token claims more than is outstanding.
    ///
    /// On error the pool is unchanged and the token is handed back.
    pub fn withdraw(&mut self, token: ShareToken) -> Result<Vec<Balance>, Refused<ShareToken>> {
        if token.pool_id() != self.id {
            let error = CisternError::PoolMismatch {
                expected: self.id,
                found: token.pool_id(),
            };
            return Err(Refused::new(error, token));
        }

        let amounts = match self.redemption_amounts(token.amount()) {
            Ok(amounts) => amounts,
            Err(error) => {
                tracing::debug!(pool = %self.name, %error, "Withdrawal rejected");
                return Err(Refused::new(error, token));
            }
        };

        let burned = token.burn();
        self.total_shares -= burned;
        for (reserve, amount) in self.reserves.iter_mut().zip(&amounts) {
            reserve.balance -= amount;
        }

        tracing::debug!(
            pool = %self.name,
            burned,
            paid_out = ?amounts,
            total_shares = self.total_shares,
            state = %self.state(),
            "Withdrawal settled"
        );

        Ok(self
            .reserves
            .iter()
            .zip(amounts)
            .map(|(reserve, amount)| Balance::new(reserve.asset.clone(), amount))
            .collect())
    }

    /// Quote what redeeming `amount` shares would pay out right now.
    ///
    /// Pure read; uses the same formula and checks as `withdraw`.
    pub fn value_of_shares(&self, amount: u64) -> Result<Vec<Balance>, CisternError> {
        let amounts = self.redemption_amounts(amount)?;
        Ok(self
            .reserves
            .iter()
            .zip(amounts)
            .map(|(reserve, amount)| Balance::new(reserve.asset.clone(), amount))
            .collect())
    }

    fn redemption_amounts(&self, shares: u64) -> Result<Vec<u64>, CisternError> {
        self.reserves
            .iter()
            .map(|reserve| asset_for_redemption(shares, reserve.balance, self.total_shares))
            .collect()
    }

    /// Hand pool administration to `new_admin`. Only the current admin may.
    pub fn transfer_admin(&mut self, caller: &Principal, new_admin: Principal) -> Result<(), CisternError> {
        self.require_admin(caller, "transfer pool administration")?;
        self.assign_admin(new_admin);
        Ok(())
    }

    /// Change which deposit shapes the pool accepts. Only the admin may.
    pub fn set_deposit_policy(&mut self, caller: &Principal, policy: DepositPolicy) -> Result<(), CisternError> {
        self.require_admin(caller, "change the deposit policy")?;
        tracing::info!(
            pool = %self.name,
            from = %self.deposit_policy,
            to = %policy,
            "Deposit policy changed"
        );
        self.deposit_policy = policy;
        Ok(())
    }

    pub(crate) fn assign_admin(&mut self, new_admin: Principal) {
        tracing::info!(
            pool = %self.name,
            from = %self.admin.short(),
            to = %new_admin.short(),
            "Pool admin reassigned"
        );
        self.admin = new_admin;
    }

    fn require_admin(&self, caller: &Principal, action: &str) -> Result<(), CisternError> {
        if caller != &self.admin {
            tracing::warn!(pool = %self.name, caller = %caller.short(), action, "Rejected non-admin caller");
            return Err(CisternError::Unauthorized(format!(
                "only the admin of pool {} may {}",
                self.name, action
            )));
        }
        Ok(())
    }

    /// Check the accounting invariants:
    /// - one or two reserve slots, with distinct assets;
    /// - no shares outstanding implies every reserve is empty;
    /// - shares outstanding implies a non-empty primary reserve.
    pub fn check_invariants(&self) -> Result<(), CisternError> {
        if self.reserves.is_empty() || self.reserves.len() > 2 {
            return Err(CisternError::InvariantViolation(format!(
                "pool {} has {} reserve slots",
                self.name,
                self.reserves.len()
            )));
        }
        self.kind()
            .validate()
            .map_err(|e| CisternError::InvariantViolation(e.to_string()))?;

        if self.total_shares == 0 {
            if let Some(r) = self.reserves.iter().find(|r| r.balance > 0) {
                return Err(CisternError::InvariantViolation(format!(
                    "pool {} has no shares outstanding but holds {} {}",
                    self.name, r.balance, r.asset
                )));
            }
        } else if self.reserves[0].balance == 0 {
            return Err(CisternError::InvariantViolation(format!(
                "pool {} has {} shares outstanding against an empty primary reserve",
                self.name, self.total_shares
            )));
        }
        Ok(())
    }
}
