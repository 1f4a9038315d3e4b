// crates/cistern-cli/src/commands/mod.rs
//
// Command module declarations for the Cistern CLI, plus the context every
// command runs with.

pub mod funds;
pub mod holdings;
pub mod init;
pub mod pool;

use std::path::PathBuf;

use cistern_core::Principal;

use crate::config::CliConfig;
use crate::ledger::{Ledger, LedgerError};
use crate::output::OutputFormat;

/// Resolved settings for one invocation.
#[derive(Debug)]
pub struct Context {
    pub config: CliConfig,
    pub state_path: PathBuf,
    pub capability_path: PathBuf,
    pub caller: Principal,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config: CliConfig, principal: &str) -> Self {
        Self {
            state_path: config.state_path(),
            capability_path: config.capability_path(),
            caller: parse_principal(principal),
            format: OutputFormat::from_flag(config.json_output),
            config,
        }
    }

    pub fn load_ledger(&self) -> Result<Ledger, LedgerError> {
        Ledger::load(&self.state_path)
    }

    pub fn save_ledger(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        ledger.save(&self.state_path)
    }
}

/// A 64-char hex string is taken as a raw key; anything else is a label.
pub fn parse_principal(raw: &str) -> Principal {
    let raw = raw.trim();
    if raw.len() == 64 {
        if let Ok(principal) = raw.parse::<Principal>() {
            return principal;
        }
    }
    Principal::from_label(raw)
}
