// crates/cistern-cli/src/ledger.rs
//
// Persisted host state for the CLI.
//
// A `Ledger` is the registry plus everything the engine hands back to its
// callers: per-principal wallet balances and share tokens. Each CLI
// invocation loads the snapshot, applies one operation, and saves it, which
// is what serializes operations against the registry. The snapshot is
// audited on every load and save, so share tokens held here must always sum
// to each pool's outstanding shares.
//
// On disk, tokens are plain `ShareRecord`s next to the registry snapshot;
// `PoolRegistry::restore` turns them back into live tokens only if the
// whole file adds up.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use cistern_core::{AssetId, Balance, CisternError, PoolId, Principal};
use cistern_pool::{
    AdminCapability, PoolRegistry, RegistryConfig, RegistrySnapshot, ShareRecord, ShareToken,
};

/// Host-side failures, wrapping engine errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Engine(#[from] CisternError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt snapshot {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No ledger at {0}; run `cistern init` first")]
    NotInitialized(PathBuf),

    #[error("A ledger already exists at {0}; pass --force to replace it")]
    AlreadyInitialized(PathBuf),

    #[error("Insufficient {asset} in wallet: requested {requested}, available {available}")]
    InsufficientFunds {
        asset: AssetId,
        requested: u64,
        available: u64,
    },

    #[error("No shares of pool {0} held by this principal")]
    NoShares(String),

    #[error("Insufficient shares of pool {pool} held: requested {requested}, held {held}")]
    InsufficientHolding {
        pool: String,
        requested: u64,
        held: u64,
    },
}

/// On-disk form of an exported admin capability.
#[derive(Debug, Serialize, Deserialize)]
struct CapabilityFile {
    registry_id: Uuid,
    secret: String,
}

/// On-disk form of a ledger.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    registry: RegistrySnapshot,
    #[serde(default)]
    wallets: BTreeMap<Principal, BTreeMap<AssetId, u64>>,
    #[serde(default)]
    holdings: BTreeMap<Principal, Vec<ShareRecord>>,
}

#[derive(Debug)]
pub struct Ledger {
    pub registry: PoolRegistry,
    wallets: BTreeMap<Principal, BTreeMap<AssetId, u64>>,
    holdings: BTreeMap<Principal, Vec<ShareToken>>,
}

impl Ledger {
    /// Start a fresh ledger around a new registry.
    pub fn create(config: RegistryConfig) -> (Self, AdminCapability) {
        let (registry, cap) = PoolRegistry::new(config);
        let ledger = Self {
            registry,
            wallets: BTreeMap::new(),
            holdings: BTreeMap::new(),
        };
        (ledger, cap)
    }

    /// Load and audit a snapshot.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        if !path.exists() {
            return Err(LedgerError::NotInitialized(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path).map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: LedgerFile = serde_json::from_str(&contents).map_err(|source| LedgerError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        let mut owners = Vec::new();
        let mut records = Vec::new();
        for (owner, held) in file.holdings {
            for record in held {
                owners.push(owner);
                records.push(record);
            }
        }
        let (registry, tokens) = PoolRegistry::restore(file.registry, &records)?;
        let mut holdings: BTreeMap<Principal, Vec<ShareToken>> = BTreeMap::new();
        for (owner, token) in owners.into_iter().zip(tokens) {
            holdings.entry(owner).or_default().push(token);
        }

        let ledger = Ledger {
            registry,
            wallets: file.wallets,
            holdings,
        };
        tracing::debug!(path = %path.display(), pools = ledger.registry.pool_count(), "Ledger loaded");
        Ok(ledger)
    }

    /// Audit and write the snapshot, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        self.audit()?;
        let file = LedgerFile {
            registry: self.registry.snapshot(),
            wallets: self.wallets.clone(),
            holdings: self
                .holdings
                .iter()
                .filter(|(_, held)| !held.is_empty())
                .map(|(owner, held)| (*owner, held.iter().map(ShareToken::record).collect()))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(CisternError::from)?;
        write_atomic(path, json.as_bytes())?;
        tracing::debug!(path = %path.display(), "Ledger saved");
        Ok(())
    }

    /// Check every pool invariant and that held tokens match outstanding shares.
    pub fn audit(&self) -> Result<(), CisternError> {
        self.registry
            .audit(self.holdings.values().flat_map(|tokens| tokens.iter()))
    }

    /// Add `balance` to `who`'s wallet.
    pub fn credit(&mut self, who: &Principal, balance: Balance) -> Result<(), CisternError> {
        let asset = balance.asset().clone();
        let slot = self.wallets.entry(*who).or_default().entry(asset.clone()).or_insert(0);
        *slot = slot.checked_add(balance.into_value()).ok_or_else(|| {
            CisternError::Arithmetic(format!("wallet balance of {} would overflow", asset))
        })?;
        Ok(())
    }

    /// Take `amount` of `asset` out of `who`'s wallet.
    pub fn debit(&mut self, who: &Principal, asset: &AssetId, amount: u64) -> Result<Balance, LedgerError> {
        let available = self.wallet_balance(who, asset);
        if amount > available {
            return Err(LedgerError::InsufficientFunds {
                asset: asset.clone(),
                requested: amount,
                available,
            });
        }
        if let Some(slot) = self.wallets.get_mut(who).and_then(|w| w.get_mut(asset)) {
            *slot -= amount;
        }
        Ok(Balance::new(asset.clone(), amount))
    }

    pub fn wallet_balance(&self, who: &Principal, asset: &AssetId) -> u64 {
        self.wallets
            .get(who)
            .and_then(|w| w.get(asset))
            .copied()
            .unwrap_or(0)
    }

    pub fn wallet(&self, who: &Principal) -> Vec<(AssetId, u64)> {
        self.wallets
            .get(who)
            .map(|w| w.iter().map(|(a, v)| (a.clone(), *v)).collect())
            .unwrap_or_default()
    }

    /// Keep `token` for `who`, merging it into any token already held for
    /// the same pool.
    pub fn store_shares(&mut self, who: &Principal, token: ShareToken) {
        let held = self.holdings.entry(*who).or_default();
        match held.iter_mut().find(|t| t.pool_id() == token.pool_id()) {
            Some(existing) => {
                if let Err(refused) = existing.merge(token) {
                    // Only reachable on share-count overflow; keep the token whole.
                    tracing::warn!(error = %refused.error, "Could not merge share tokens");
                    held.push(refused.returned);
                }
            }
            None => held.push(token),
        }
    }

    /// Hand out `amount` shares of `pool_id` held by `who`, or all of them
    /// when `amount` is `None`.
    pub fn take_shares(
        &mut self,
        who: &Principal,
        pool_name: &str,
        pool_id: PoolId,
        amount: Option<u64>,
    ) -> Result<ShareToken, LedgerError> {
        let held = self
            .holdings
            .get_mut(who)
            .ok_or_else(|| LedgerError::NoShares(pool_name.to_string()))?;
        let index = held
            .iter()
            .position(|t| t.pool_id() == pool_id)
            .ok_or_else(|| LedgerError::NoShares(pool_name.to_string()))?;

        match amount {
            Some(amount) if amount < held[index].amount() => Ok(held[index].split(amount)?),
            Some(amount) if amount > held[index].amount() => Err(LedgerError::InsufficientHolding {
                pool: pool_name.to_string(),
                requested: amount,
                held: held[index].amount(),
            }),
            _ => Ok(held.swap_remove(index)),
        }
    }

    pub fn holdings(&self, who: &Principal) -> &[ShareToken] {
        self.holdings.get(who).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Persist `cap` so a later invocation can present it.
pub fn save_capability(path: &Path, cap: &AdminCapability) -> Result<(), LedgerError> {
    let file = CapabilityFile {
        registry_id: cap.registry_id(),
        secret: cap.export_secret(),
    };
    let json = serde_json::to_string_pretty(&file).map_err(CisternError::from)?;
    write_atomic(path, json.as_bytes())?;
    restrict_permissions(path)?;
    Ok(())
}

/// Read back a capability written by [`save_capability`].
pub fn load_capability(path: &Path) -> Result<AdminCapability, LedgerError> {
    let contents = fs::read_to_string(path).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: CapabilityFile = serde_json::from_str(&contents).map_err(|source| LedgerError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(AdminCapability::import(file.registry_id, &file.secret)?)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LedgerError> {
    let io_err = |source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), LedgerError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), LedgerError> {
    Ok(())
}
