// crates/cistern-core/src/lib.rs
//
// cistern-core: Core types, error taxonomy, and crypto primitives for the
// Cistern liquidity-pool accounting engine.
//
// This is the leaf crate that every other crate in the workspace depends on.
// It defines caller and pool identifiers, the fungible asset balance that
// pools custody, the protocol-wide error type, and the ed25519/SHA-256
// helpers used for capability proofs and label-derived principals.

pub mod asset;
pub mod crypto;
pub mod error;
pub mod identity;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use cistern_core::Balance;`

// Asset types
pub use asset::{AssetId, Balance};

// Identity types
pub use identity::{PoolId, Principal};

// Error type
pub use error::CisternError;
