// crates/cistern-pool/src/lib.rs
//
// cistern-pool: proportional-ownership pool accounting for Cistern.
//
// Deposits of one or two reserve assets mint fungible `ShareToken`s;
// presenting shares redeems a proportional slice of the current reserves.
// Pools live in a `PoolRegistry` whose mutation is gated by an
// `AdminCapability`.
//
// Every operation validates and computes first and mutates last, so a
// returned error always means nothing changed. Hosts are expected to
// serialize calls against a given registry.

pub mod capability;
pub mod math;
pub mod pool;
pub mod registry;
pub mod share;
pub mod snapshot;

// Re-export key types for ergonomic access from downstream crates.
pub use capability::AdminCapability;
pub use math::{asset_for_redemption, share_for_deposit};
pub use pool::{DepositPolicy, Pool, PoolKind, PoolState, Reserve};
pub use registry::{PoolRegistry, RegistryConfig};
pub use share::{Refused, ShareToken};
pub use snapshot::{PoolRecord, RegistrySnapshot, ShareRecord};

pub use cistern_core::{AssetId, Balance, CisternError, PoolId, Principal};
