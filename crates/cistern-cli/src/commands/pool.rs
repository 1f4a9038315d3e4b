// crates/cistern-cli/src/commands/pool.rs
//
// `cistern pool {create, set-admin, policy, list, show}`: pool management.
//
// `create` and `set-admin` need the registry's admin capability, read from
// the capability file. `policy` is authorized by the pool admin (`--as`).

use clap::Subcommand;

use cistern_core::AssetId;
use cistern_pool::{DepositPolicy, PoolKind};

use super::{parse_principal, Context};
use crate::ledger::{load_capability, LedgerError};
use crate::output::{emit, pool_detail, OutputFormat, PoolRow};

/// Pool management subcommands.
#[derive(Debug, Subcommand)]
pub enum PoolCmd {
    /// Create a pool (requires the admin capability).
    Create {
        /// Unique pool name.
        #[arg(long)]
        name: String,
        /// Primary reserve asset.
        #[arg(long)]
        base: String,
        /// Secondary reserve asset, for a dual-asset pool.
        #[arg(long)]
        paired: Option<String>,
        /// Pool admin (hex key or label); defaults to the caller.
        #[arg(long)]
        admin: Option<String>,
    },
    /// Reassign a pool's admin (requires the admin capability).
    SetAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        admin: String,
    },
    /// Change a dual-asset pool's deposit policy (pool admin only).
    Policy {
        #[arg(long)]
        name: String,
        /// `primary-only` or `simultaneous`.
        #[arg(long)]
        policy: DepositPolicy,
    },
    /// List all pools.
    List,
    /// Show one pool in detail.
    Show {
        #[arg(long)]
        name: String,
    },
}

/// Run the pool subcommand.
pub fn run(ctx: &Context, cmd: &PoolCmd) -> Result<(), LedgerError> {
    match cmd {
        PoolCmd::Create {
            name,
            base,
            paired,
            admin,
        } => create(ctx, name, base, paired.as_deref(), admin.as_deref()),
        PoolCmd::SetAdmin { name, admin } => set_admin(ctx, name, admin),
        PoolCmd::Policy { name, policy } => set_policy(ctx, name, *policy),
        PoolCmd::List => list(ctx),
        PoolCmd::Show { name } => show(ctx, name),
    }
}

fn create(
    ctx: &Context,
    name: &str,
    base: &str,
    paired: Option<&str>,
    admin: Option<&str>,
) -> Result<(), LedgerError> {
    let mut ledger = ctx.load_ledger()?;
    let cap = load_capability(&ctx.capability_path)?;

    let base = AssetId::new(base)?;
    let kind = match paired {
        Some(paired) => PoolKind::Pair {
            base,
            paired: AssetId::new(paired)?,
        },
        None => PoolKind::Single { base },
    };
    let admin = admin.map(parse_principal);

    ledger
        .registry
        .create_pool(&cap, &ctx.caller, name, kind, admin)?;
    ctx.save_ledger(&ledger)?;

    let pool = ledger.registry.pool(name.trim())?;
    let rows = pool_detail(pool);
    emit(ctx.format, &rows, pool);
    Ok(())
}

fn set_admin(ctx: &Context, name: &str, admin: &str) -> Result<(), LedgerError> {
    let mut ledger = ctx.load_ledger()?;
    let cap = load_capability(&ctx.capability_path)?;

    ledger
        .registry
        .set_pool_admin(&cap, name, parse_principal(admin))?;
    ctx.save_ledger(&ledger)?;

    let pool = ledger.registry.pool(name)?;
    emit(ctx.format, &pool_detail(pool), pool);
    Ok(())
}

fn set_policy(ctx: &Context, name: &str, policy: DepositPolicy) -> Result<(), LedgerError> {
    let mut ledger = ctx.load_ledger()?;
    ledger
        .registry
        .pool_mut(name)?
        .set_deposit_policy(&ctx.caller, policy)?;
    ctx.save_ledger(&ledger)?;

    let pool = ledger.registry.pool(name)?;
    emit(ctx.format, &pool_detail(pool), pool);
    Ok(())
}

fn list(ctx: &Context) -> Result<(), LedgerError> {
    let ledger = ctx.load_ledger()?;
    let rows: Vec<PoolRow> = ledger.registry.pools().map(PoolRow::from).collect();
    if rows.is_empty() && ctx.format == OutputFormat::Table {
        println!("No pools registered. Create one with `cistern pool create`.");
        return Ok(());
    }
    emit(ctx.format, &rows, &rows);
    Ok(())
}

fn show(ctx: &Context, name: &str) -> Result<(), LedgerError> {
    let ledger = ctx.load_ledger()?;
    let pool = ledger.registry.pool(name)?;
    emit(ctx.format, &pool_detail(pool), pool);
    Ok(())
}
