// crates/cistern-pool/tests/pool_lifecycle.rs
//
// Lifecycle tests for the pool engine through its public API only:
// registry creation, capability-gated pool creation, deposits, share
// movement between holders, and redemption back to an Empty pool.

use cistern_pool::{
    AdminCapability, AssetId, Balance, CisternError, DepositPolicy, PoolKind, PoolRegistry,
    PoolState, Principal, RegistryConfig, RegistrySnapshot, ShareRecord, ShareToken,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sui() -> AssetId {
    AssetId::new("SUI").unwrap()
}

fn usdc() -> AssetId {
    AssetId::new("USDC").unwrap()
}

fn coins(value: u64) -> Balance {
    Balance::new(sui(), value)
}

fn registry_with_pool(name: &str, kind: PoolKind) -> (PoolRegistry, AdminCapability) {
    let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
    registry
        .create_pool(&cap, &Principal::from_label("operator"), name, kind, None)
        .unwrap();
    (registry, cap)
}

fn single(name: &str) -> (PoolRegistry, AdminCapability) {
    registry_with_pool(name, PoolKind::Single { base: sui() })
}

fn paid(balances: Vec<Balance>) -> Vec<u64> {
    balances.into_iter().map(Balance::into_value).collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_alice_and_bob_end_to_end() {
    let (mut registry, _cap) = single("sui");
    let pool = registry.pool_mut("sui").unwrap();
    assert_eq!(pool.state(), PoolState::Empty);

    // Alice bootstraps the pool.
    let mut alice = pool.deposit(vec![coins(1_000)]).unwrap();
    assert_eq!(alice.amount(), 1_000);
    assert_eq!(pool.total_shares(), 1_000);
    assert_eq!(pool.reserve(0), Some(1_000));

    // Bob joins at the 1:1 rate.
    let bob = pool.deposit(vec![coins(500)]).unwrap();
    assert_eq!(bob.amount(), 500);
    assert_eq!(pool.total_shares(), 1_500);
    assert_eq!(pool.reserve(0), Some(1_500));

    // Alice splits her token and redeems one half.
    let alice_half = alice.split(500).unwrap();
    assert_eq!(alice.amount(), 500);
    assert_eq!(paid(pool.withdraw(alice_half).unwrap()), vec![500]);
    assert_eq!(pool.reserve(0), Some(1_000));
    assert_eq!(pool.total_shares(), 1_000);

    // Bob leaves.
    assert_eq!(paid(pool.withdraw(bob).unwrap()), vec![500]);
    assert_eq!(pool.reserve(0), Some(500));
    assert_eq!(pool.total_shares(), 500);

    // Alice drains the pool.
    assert_eq!(paid(pool.withdraw(alice).unwrap()), vec![500]);
    assert_eq!(pool.reserve(0), Some(0));
    assert_eq!(pool.total_shares(), 0);
    assert_eq!(pool.state(), PoolState::Empty);
    assert!(registry.audit(std::iter::empty::<&ShareToken>()).is_ok());
}

#[test]
fn test_proportional_mint_examples() {
    let (mut registry, _cap) = single("sui");
    let pool = registry.pool_mut("sui").unwrap();

    let _first = pool.deposit(vec![coins(1_000)]).unwrap();
    let second = pool.deposit(vec![coins(2_000)]).unwrap();
    assert_eq!(second.amount(), 2_000);

    let (mut registry, _cap) = single("other");
    let pool = registry.pool_mut("other").unwrap();
    let _seed = pool.deposit(vec![coins(1_500)]).unwrap();
    assert_eq!(pool.deposit(vec![coins(500)]).unwrap().amount(), 500);
}

#[test]
fn test_shares_move_between_holders() {
    let (mut registry, _cap) = single("sui");
    let pool = registry.pool_mut("sui").unwrap();

    let mut alice = pool.deposit(vec![coins(900)]).unwrap();
    let gift = alice.split(300).unwrap();

    // Bob receives the gift and merges it with his own deposit.
    let mut bob = pool.deposit(vec![coins(100)]).unwrap();
    bob.merge(gift).unwrap();
    assert_eq!(bob.amount(), 400);
    assert_eq!(pool.total_shares(), 1_000);
    assert!(registry.audit([&alice, &bob]).is_ok());

    let pool = registry.pool_mut("sui").unwrap();
    assert_eq!(paid(pool.withdraw(bob).unwrap()), vec![400]);
    assert_eq!(paid(pool.withdraw(alice).unwrap()), vec![600]);
}

#[test]
fn test_tokens_from_different_pools_do_not_mix() {
    let (mut registry, cap) = single("a");
    registry
        .create_pool(
            &cap,
            &Principal::from_label("operator"),
            "b",
            PoolKind::Single { base: sui() },
            None,
        )
        .unwrap();

    let mut in_a = registry.pool_mut("a").unwrap().deposit(vec![coins(10)]).unwrap();
    let in_b = registry.pool_mut("b").unwrap().deposit(vec![coins(20)]).unwrap();

    let (err, in_b) = in_a.merge(in_b).unwrap_err().into_parts();
    assert!(matches!(err, CisternError::PoolMismatch { .. }));

    let (err, in_b) = registry
        .pool_mut("a")
        .unwrap()
        .withdraw(in_b)
        .unwrap_err()
        .into_parts();
    assert!(matches!(err, CisternError::PoolMismatch { .. }));
    assert!(registry.audit([&in_a, &in_b]).is_ok());
}

#[test]
fn test_dual_asset_pool_primary_only() {
    let (mut registry, _cap) = registry_with_pool(
        "sui-usdc",
        PoolKind::Pair {
            base: sui(),
            paired: usdc(),
        },
    );
    let pool = registry.pool_mut("sui-usdc").unwrap();
    assert_eq!(pool.deposit_policy(), DepositPolicy::PrimaryOnly);

    let a = pool.deposit(vec![coins(1_000)]).unwrap();
    let b = pool
        .deposit(vec![coins(1_000), Balance::new(usdc(), 4_000)])
        .unwrap();
    assert_eq!(b.amount(), 1_000);

    // Both holders own half of each reserve, regardless of who brought USDC.
    assert_eq!(paid(pool.value_of_shares(1_000).unwrap()), vec![1_000, 2_000]);
    assert_eq!(paid(pool.withdraw(a).unwrap()), vec![1_000, 2_000]);
    assert_eq!(paid(pool.withdraw(b).unwrap()), vec![1_000, 2_000]);
    assert_eq!(pool.state(), PoolState::Empty);
}

#[test]
fn test_dual_asset_pool_simultaneous_policy() {
    let (mut registry, _cap) = registry_with_pool(
        "sui-usdc",
        PoolKind::Pair {
            base: sui(),
            paired: usdc(),
        },
    );
    let admin = Principal::from_label("operator");
    let pool = registry.pool_mut("sui-usdc").unwrap();
    pool.set_deposit_policy(&admin, DepositPolicy::Simultaneous)
        .unwrap();

    let (err, returned) = pool.deposit(vec![coins(10)]).unwrap_err().into_parts();
    assert!(matches!(err, CisternError::InvalidAmount(_)));
    assert_eq!(paid(returned), vec![10]);
    assert_eq!(pool.state(), PoolState::Empty);

    let token = pool
        .deposit(vec![coins(10), Balance::new(usdc(), 30)])
        .unwrap();
    assert_eq!(token.amount(), 10);
}

#[test]
fn test_zero_amounts_leave_state_unchanged() {
    let (mut registry, _cap) = single("sui");
    let pool = registry.pool_mut("sui").unwrap();
    let _holder = pool.deposit(vec![coins(250)]).unwrap();
    let before = serde_json::to_value(&*pool).unwrap();

    assert!(matches!(
        pool.deposit(vec![coins(0)]).unwrap_err().error,
        CisternError::InvalidAmount(_)
    ));
    assert!(matches!(
        pool.withdraw(ShareToken::zero(pool.id())).unwrap_err().error,
        CisternError::InvalidAmount(_)
    ));
    assert_eq!(serde_json::to_value(&*pool).unwrap(), before);
}

#[test]
fn test_duplicate_pool_name_keeps_first() {
    let (mut registry, cap) = single("sui");
    let first_id = registry.pool("sui").unwrap().id();
    let err = registry
        .create_pool(
            &cap,
            &Principal::from_label("someone"),
            "sui",
            PoolKind::Pair {
                base: sui(),
                paired: usdc(),
            },
            None,
        )
        .unwrap_err();
    assert_eq!(err, CisternError::DuplicatePoolName("sui".to_string()));
    let pool = registry.pool("sui").unwrap();
    assert_eq!(pool.id(), first_id);
    assert_eq!(pool.kind(), PoolKind::Single { base: sui() });
}

#[test]
fn test_capability_survives_export_and_transfer() {
    let (mut registry, cap) = PoolRegistry::new(RegistryConfig::default());
    let secret = cap.export_secret();
    let registry_id = cap.registry_id();
    drop(cap);

    // A new holder re-imports the capability and keeps creating pools.
    let new_holder = AdminCapability::import(registry_id, &secret).unwrap();
    registry
        .create_pool(
            &new_holder,
            &Principal::from_label("new-holder"),
            "sui",
            PoolKind::Single { base: sui() },
            None,
        )
        .unwrap();
    assert_eq!(
        registry.pool("sui").unwrap().admin(),
        &Principal::from_label("new-holder")
    );
}

#[test]
fn test_many_depositors_conserve_value() {
    let (mut registry, _cap) = single("sui");
    let pool = registry.pool_mut("sui").unwrap();

    let deposits = [1_000u64, 37, 512, 9, 4_096, 73];
    let tokens: Vec<ShareToken> = deposits
        .iter()
        .map(|d| pool.deposit(vec![coins(*d)]).unwrap())
        .collect();

    let total_in: u64 = deposits.iter().sum();
    let mut total_out = 0u64;
    for token in tokens {
        total_out += paid(pool.withdraw(token).unwrap())[0];
    }
    assert!(total_out <= total_in);
    assert_eq!(pool.reserve(0), Some(total_in - total_out));
    assert_eq!(pool.state(), PoolState::Empty);
    assert_eq!(pool.reserve(0), Some(0));
}

#[test]
fn test_persisted_claims_cannot_outgrow_the_pool() {
    let (mut registry, _cap) = single("sui");
    let alice = registry.pool_mut("sui").unwrap().deposit(vec![coins(1_000)]).unwrap();

    // Copying Alice's persisted claim is rejected as a whole on restore.
    let json = serde_json::to_string(&registry.snapshot()).unwrap();
    let copied = vec![alice.record(), alice.record()];
    let snapshot: RegistrySnapshot = serde_json::from_str(&json).unwrap();
    assert!(matches!(
        PoolRegistry::restore(snapshot, &copied),
        Err(CisternError::InvariantViolation(_))
    ));

    // The honest set restores and pays out exactly once.
    let snapshot: RegistrySnapshot = serde_json::from_str(&json).unwrap();
    let (mut restored, mut tokens) = PoolRegistry::restore(snapshot, &[alice.record()]).unwrap();
    let token = tokens.pop().unwrap();
    let pool = restored.pool_mut("sui").unwrap();
    assert_eq!(paid(pool.withdraw(token).unwrap()), vec![1_000]);
    assert_eq!(pool.state(), PoolState::Empty);
    assert!(restored.audit(std::iter::empty::<&ShareToken>()).is_ok());

    let stray = ShareRecord {
        pool_id: alice.pool_id(),
        amount: 1,
    };
    let json = serde_json::to_string(&restored.snapshot()).unwrap();
    let snapshot: RegistrySnapshot = serde_json::from_str(&json).unwrap();
    assert!(PoolRegistry::restore(snapshot, &[stray]).is_err());
}
