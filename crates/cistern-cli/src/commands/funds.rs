// crates/cistern-cli/src/commands/funds.rs
//
// `cistern {faucet, deposit, withdraw, quote}`: moving value between the
// caller's wallet and the pools.
//
// A command that fails returns before `save_ledger`, so the snapshot on disk
// is untouched. Refused values are still handed back to the in-memory ledger
// so it never drifts from the audit.

use clap::Args;
use serde::Serialize;

use cistern_core::{AssetId, Balance, CisternError};

use super::Context;
use crate::ledger::{Ledger, LedgerError};
use crate::output::{emit, FieldRow};

#[derive(Debug, Args)]
pub struct FaucetArgs {
    /// Asset to mint into the wallet.
    #[arg(long)]
    pub asset: String,
    /// Amount in the asset's smallest unit.
    #[arg(long)]
    pub amount: u64,
}

#[derive(Debug, Args)]
pub struct DepositArgs {
    /// Pool name.
    #[arg(long)]
    pub pool: String,
    /// Amount of the primary asset.
    #[arg(long)]
    pub base: u64,
    /// Amount of the secondary asset (dual-asset pools).
    #[arg(long)]
    pub paired: Option<u64>,
}

#[derive(Debug, Args)]
pub struct WithdrawArgs {
    /// Pool name.
    #[arg(long)]
    pub pool: String,
    /// Shares to redeem; all held shares when omitted.
    #[arg(long)]
    pub shares: Option<u64>,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Pool name.
    #[arg(long)]
    pub pool: String,
    /// Number of shares to value.
    #[arg(long)]
    pub shares: u64,
}

/// JSON shape of a deposit/withdraw/quote result.
#[derive(Debug, Serialize)]
struct Movement {
    pool: String,
    shares: u64,
    assets: Vec<(String, u64)>,
    total_shares: u64,
}

impl Movement {
    fn rows(&self, shares_label: &str) -> Vec<FieldRow> {
        let mut rows = vec![
            FieldRow::new("Pool", &self.pool),
            FieldRow::new(shares_label, self.shares),
        ];
        for (asset, amount) in &self.assets {
            rows.push(FieldRow::new(asset, amount));
        }
        rows.push(FieldRow::new("Pool total shares", self.total_shares));
        rows
    }
}

/// Credit the caller's wallet. There is no real custody behind this; it is
/// how value enters the ledger.
pub fn faucet(ctx: &Context, args: &FaucetArgs) -> Result<(), LedgerError> {
    if args.amount == 0 {
        return Err(CisternError::InvalidAmount("faucet amount must be positive".to_string()).into());
    }
    let mut ledger = ctx.load_ledger()?;
    let asset = AssetId::new(&args.asset)?;
    ledger.credit(&ctx.caller, Balance::new(asset.clone(), args.amount))?;
    ctx.save_ledger(&ledger)?;

    tracing::info!(who = %ctx.caller.short(), %asset, amount = args.amount, "Faucet credit");
    let rows = vec![
        FieldRow::new("Credited", format!("{} {}", args.amount, asset)),
        FieldRow::new("Wallet balance", ledger.wallet_balance(&ctx.caller, &asset)),
    ];
    emit(ctx.format, &rows, &rows);
    Ok(())
}

/// Move wallet funds into a pool and keep the minted shares.
pub fn deposit(ctx: &Context, args: &DepositArgs) -> Result<(), LedgerError> {
    let mut ledger = ctx.load_ledger()?;
    let assets: Vec<AssetId> = ledger
        .registry
        .pool(&args.pool)?
        .reserves()
        .iter()
        .map(|r| r.asset().clone())
        .collect();

    let mut payment = vec![ledger.debit(&ctx.caller, &assets[0], args.base)?];
    if let Some(paired) = args.paired {
        let asset = assets.get(1).ok_or_else(|| {
            CisternError::InvalidAmount(format!("pool {} holds a single asset", args.pool))
        })?;
        payment.push(ledger.debit(&ctx.caller, asset, paired)?);
    }

    let pool = ledger.registry.pool_mut(&args.pool)?;
    let token = match pool.deposit(payment) {
        Ok(token) => token,
        Err(refused) => {
            let (error, returned) = refused.into_parts();
            refund(&mut ledger, ctx, returned)?;
            return Err(error.into());
        }
    };
    let movement = Movement {
        pool: args.pool.clone(),
        shares: token.amount(),
        assets: paid_in(&assets, args),
        total_shares: pool.total_shares(),
    };
    ledger.store_shares(&ctx.caller, token);
    ctx.save_ledger(&ledger)?;

    emit(ctx.format, &movement.rows("Shares minted"), &movement);
    Ok(())
}

/// Redeem some or all of the caller's shares in a pool.
pub fn withdraw(ctx: &Context, args: &WithdrawArgs) -> Result<(), LedgerError> {
    let mut ledger = ctx.load_ledger()?;
    let pool_id = ledger.registry.pool(&args.pool)?.id();
    let token = ledger.take_shares(&ctx.caller, &args.pool, pool_id, args.shares)?;
    let shares = token.amount();

    let pool = ledger.registry.pool_mut(&args.pool)?;
    let payout = match pool.withdraw(token) {
        Ok(payout) => payout,
        Err(refused) => {
            let (error, token) = refused.into_parts();
            ledger.store_shares(&ctx.caller, token);
            return Err(error.into());
        }
    };
    let total_shares = pool.total_shares();

    let mut assets = Vec::with_capacity(payout.len());
    for balance in payout {
        assets.push((balance.asset().to_string(), balance.value()));
        ledger.credit(&ctx.caller, balance)?;
    }
    ctx.save_ledger(&ledger)?;

    let movement = Movement {
        pool: args.pool.clone(),
        shares,
        assets,
        total_shares,
    };
    emit(ctx.format, &movement.rows("Shares redeemed"), &movement);
    Ok(())
}

/// Value `shares` at the pool's current reserves without moving anything.
pub fn quote(ctx: &Context, args: &QuoteArgs) -> Result<(), LedgerError> {
    let ledger = ctx.load_ledger()?;
    let pool = ledger.registry.pool(&args.pool)?;
    let value = pool.value_of_shares(args.shares)?;

    let movement = Movement {
        pool: args.pool.clone(),
        shares: args.shares,
        assets: value
            .into_iter()
            .map(|b| (b.asset().to_string(), b.into_value()))
            .collect(),
        total_shares: pool.total_shares(),
    };
    emit(ctx.format, &movement.rows("Shares"), &movement);
    Ok(())
}

fn refund(ledger: &mut Ledger, ctx: &Context, returned: Vec<Balance>) -> Result<(), CisternError> {
    for balance in returned {
        ledger.credit(&ctx.caller, balance)?;
    }
    Ok(())
}

fn paid_in(assets: &[AssetId], args: &DepositArgs) -> Vec<(String, u64)> {
    let mut paid = vec![(assets[0].to_string(), args.base)];
    if let (Some(asset), Some(amount)) = (assets.get(1), args.paired) {
        paid.push((asset.to_string(), amount));
    }
    paid
}
