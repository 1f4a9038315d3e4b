// crates/cistern-cli/src/commands/init.rs
//
// `cistern init`: create a registry, its ledger snapshot and the admin
// capability file.

use cistern_pool::RegistryConfig;

use super::Context;
use crate::ledger::{save_capability, Ledger, LedgerError};
use crate::output::{emit, FieldRow, OutputFormat};

/// Run the init command.
pub fn run(ctx: &Context, force: bool) -> Result<(), LedgerError> {
    if ctx.state_path.exists() && !force {
        return Err(LedgerError::AlreadyInitialized(ctx.state_path.clone()));
    }

    let config = RegistryConfig {
        default_deposit_policy: ctx.config.default_deposit_policy,
    };
    let (ledger, cap) = Ledger::create(config);

    // Capability first: a ledger without its capability is unusable.
    save_capability(&ctx.capability_path, &cap)?;
    ctx.save_ledger(&ledger)?;

    tracing::info!(registry = %ledger.registry.id(), "Registry initialized");

    let rows = vec![
        FieldRow::new("Registry", ledger.registry.id()),
        FieldRow::new("Default deposit policy", ledger.registry.config().default_deposit_policy),
        FieldRow::new("Ledger", ctx.state_path.display()),
        FieldRow::new("Capability", ctx.capability_path.display()),
    ];
    emit(ctx.format, &rows, &rows);
    if ctx.format == OutputFormat::Table {
        println!();
        println!("IMPORTANT: The capability file is the only way to create pools. Back it up securely.");
    }
    Ok(())
}
