// crates/cistern-pool/src/capability.rs
//
// The registry's administrative capability.
//
// A capability is an ed25519 signing key bound to one registry. The registry
// keeps only the public half; presenting the capability means signing the
// registry's challenge, which the registry verifies. Consequences:
//   - there is exactly one capability per registry (issued by
//     `PoolRegistry::new`);
//   - it cannot be duplicated in-process (no `Clone`), only moved;
//   - it can be exported as a secret and re-imported by its next holder,
//     which is how it crosses process boundaries.

use std::fmt;
use uuid::Uuid;

use cistern_core::crypto::Keypair;
use cistern_core::error::CisternError;

/// Domain separator for capability proofs.
const CHALLENGE_PREFIX: &[u8] = b"cistern/registry-admin/v1/";

/// Proof of authority over one pool registry.
pub struct AdminCapability {
    registry_id: Uuid,
    keypair: Keypair,
}

impl AdminCapability {
    /// Issue a fresh capability for `registry_id`.
    pub(crate) fn issue(registry_id: Uuid) -> Self {
        Self {
            registry_id,
            keypair: Keypair::generate(),
        }
    }

    /// Re-import a capability previously exported with [`export_secret`].
    ///
    /// Importing never grants authority by itself: a registry only accepts
    /// the key whose public half it recorded at issue time.
    ///
    /// [`export_secret`]: AdminCapability::export_secret
    pub fn import(registry_id: Uuid, secret_hex: &str) -> Result<Self, CisternError> {
        Ok(Self {
            registry_id,
            keypair: Keypair::from_secret_hex(secret_hex)?,
        })
    }

    /// Hex-encoded signing secret, for handing the capability to another
    /// process or custody system.
    pub fn export_secret(&self) -> String {
        self.keypair.secret_hex()
    }

    /// Registry this capability was issued for.
    pub fn registry_id(&self) -> Uuid {
        self.registry_id
    }

    pub(crate) fn public_key(&self) -> [u8; 32] {
        self.keypair.public_key_bytes()
    }

    /// Sign the challenge of the registry this capability claims.
    pub(crate) fn prove(&self) -> Vec<u8> {
        self.keypair.sign(&challenge(&self.registry_id))
    }
}

impl fmt::Debug for AdminCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCapability")
            .field("registry_id", &self.registry_id)
            .field("public_key", &hex_prefix(&self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Message a capability signs to prove authority over `registry_id`.
pub(crate) fn challenge(registry_id: &Uuid) -> Vec<u8> {
    let mut msg = CHALLENGE_PREFIX.to_vec();
    msg.extend_from_slice(registry_id.as_bytes());
    msg
}

fn hex_prefix(bytes: &[u8; 32]) -> String {
    bytes[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
