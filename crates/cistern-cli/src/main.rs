// crates/cistern-cli/src/main.rs
//
// CLI entrypoint for Cistern.
//
// Each invocation loads the ledger snapshot, runs one operation against the
// pool registry, and writes the snapshot back.

mod commands;
mod config;
mod ledger;
mod output;

use clap::{Parser, Subcommand};
use commands::funds::{DepositArgs, FaucetArgs, QuoteArgs, WithdrawArgs};
use commands::pool::PoolCmd;
use commands::Context;
use config::CliConfig;

/// Cistern: proportional-ownership liquidity pools.
#[derive(Parser, Debug)]
#[command(
    name = "cistern",
    version = "0.1.0",
    about = "Cistern CLI: pool registry, deposits, withdrawals and share accounting"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "~/.cistern/config.toml")]
    config: String,

    /// Ledger snapshot path (overrides `state_file` from the config).
    #[arg(long, global = true)]
    state: Option<String>,

    /// Acting principal: 64-char hex key or a label hashed into one.
    #[arg(long = "as", global = true, default_value = "operator")]
    principal: String,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a registry and write a fresh ledger and admin capability.
    Init {
        /// Replace an existing ledger.
        #[arg(long)]
        force: bool,
    },

    /// Pool management: create, set-admin, policy, list, show.
    #[command(subcommand)]
    Pool(PoolCmd),

    /// Credit the caller's wallet with test funds.
    Faucet(FaucetArgs),

    /// Deposit wallet funds into a pool for shares.
    Deposit(DepositArgs),

    /// Redeem held shares for reserve assets.
    Withdraw(WithdrawArgs),

    /// Value a number of shares at current reserves.
    Quote(QuoteArgs),

    /// Show the caller's wallet and share holdings.
    Holdings,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Config comes first so its log level can seed the filter; report a
    // fallback once the subscriber is up.
    let loaded = CliConfig::load(&cli.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => CliConfig::default(),
    };
    if cli.json {
        config.json_output = true;
    }
    if let Some(state) = &cli.state {
        config.state_file = state.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = &loaded {
        tracing::warn!("Could not load config from {}: {}. Using defaults.", cli.config, e);
    }

    let ctx = Context::new(config, &cli.principal);
    tracing::debug!(caller = %ctx.caller.short(), state = %ctx.state_path.display(), "Running command");

    match &cli.command {
        Commands::Init { force } => commands::init::run(&ctx, *force)?,
        Commands::Pool(cmd) => commands::pool::run(&ctx, cmd)?,
        Commands::Faucet(args) => commands::funds::faucet(&ctx, args)?,
        Commands::Deposit(args) => commands::funds::deposit(&ctx, args)?,
        Commands::Withdraw(args) => commands::funds::withdraw(&ctx, args)?,
        Commands::Quote(args) => commands::funds::quote(&ctx, args)?,
        Commands::Holdings => commands::holdings::run(&ctx)?,
    }

    Ok(())
}
