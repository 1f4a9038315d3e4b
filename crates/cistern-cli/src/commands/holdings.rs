// crates/cistern-cli/src/commands/holdings.rs
//
// `cistern holdings`: the caller's wallet balances and share tokens.

use serde::Serialize;

use super::Context;
use crate::ledger::{Ledger, LedgerError};
use crate::output::{emit, HoldingRow};

#[derive(Debug, Serialize)]
struct HoldingsView {
    principal: String,
    wallet: Vec<(String, u64)>,
    shares: Vec<ShareView>,
}

#[derive(Debug, Serialize)]
struct ShareView {
    pool: String,
    pool_id: String,
    amount: u64,
}

/// Run the holdings command.
pub fn run(ctx: &Context) -> Result<(), LedgerError> {
    let ledger = ctx.load_ledger()?;
    let view = collect(&ledger, ctx);

    let mut rows: Vec<HoldingRow> = view
        .wallet
        .iter()
        .map(|(asset, amount)| HoldingRow::wallet(asset, *amount))
        .collect();
    rows.extend(view.shares.iter().map(|s| HoldingRow::shares(&s.pool, s.amount)));

    emit(ctx.format, &rows, &view);
    Ok(())
}

fn collect(ledger: &Ledger, ctx: &Context) -> HoldingsView {
    let shares = ledger
        .holdings(&ctx.caller)
        .iter()
        .map(|token| ShareView {
            pool: ledger
                .registry
                .pool_by_id(token.pool_id())
                .map(|p| p.name().to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            pool_id: token.pool_id().to_string(),
            amount: token.amount(),
        })
        .collect();

    HoldingsView {
        principal: ctx.caller.to_hex(),
        wallet: ledger
            .wallet(&ctx.caller)
            .into_iter()
            .map(|(asset, amount)| (asset.to_string(), amount))
            .collect(),
        shares,
    }
}
