// crates/cistern-cli/src/output.rs
//
// Output formatting utilities for the Cistern CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use tabled::{Table, Tabled};

use cistern_pool::Pool;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Print `rows` as a table, or `json` as JSON.
pub fn emit<T: Tabled, J: Serialize>(format: OutputFormat, rows: &[T], json: &J) {
    match format {
        OutputFormat::Table => println!("{}", format_table(rows)),
        OutputFormat::Json => println!("{}", format_json(json)),
    }
}

/// One line of `pool list`.
#[derive(Debug, Serialize, Tabled)]
pub struct PoolRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Reserves")]
    pub reserves: String,
    #[tabled(rename = "Shares")]
    pub total_shares: u64,
    #[tabled(rename = "Policy")]
    pub policy: String,
    #[tabled(rename = "Admin")]
    pub admin: String,
}

impl From<&Pool> for PoolRow {
    fn from(pool: &Pool) -> Self {
        Self {
            name: pool.name().to_string(),
            state: pool.state().to_string(),
            reserves: describe_reserves(pool),
            total_shares: pool.total_shares(),
            policy: pool.deposit_policy().to_string(),
            admin: pool.admin().short(),
        }
    }
}

/// A labelled field, for single-record views.
#[derive(Debug, Serialize, Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl FieldRow {
    pub fn new(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Full view of one pool for `pool show`.
pub fn pool_detail(pool: &Pool) -> Vec<FieldRow> {
    let mut rows = vec![
        FieldRow::new("Name", pool.name()),
        FieldRow::new("Id", pool.id()),
        FieldRow::new("State", pool.state()),
        FieldRow::new("Admin", pool.admin()),
        FieldRow::new("Deposit policy", pool.deposit_policy()),
        FieldRow::new("Total shares", pool.total_shares()),
        FieldRow::new("Created", pool.created_at().to_rfc3339()),
    ];
    for (slot, reserve) in pool.reserves().iter().enumerate() {
        let label = if slot == 0 { "Primary reserve" } else { "Secondary reserve" };
        rows.push(FieldRow::new(
            label,
            format!("{} {}", reserve.balance(), reserve.asset()),
        ));
    }
    rows
}

/// One held share token, or one wallet balance, for `holdings`.
#[derive(Debug, Serialize, Tabled)]
pub struct HoldingRow {
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Of")]
    pub of: String,
    #[tabled(rename = "Amount")]
    pub amount: u64,
}

impl HoldingRow {
    pub fn shares(pool_name: &str, amount: u64) -> Self {
        Self {
            kind: "shares".to_string(),
            of: pool_name.to_string(),
            amount,
        }
    }

    pub fn wallet(asset: &str, amount: u64) -> Self {
        Self {
            kind: "wallet".to_string(),
            of: asset.to_string(),
            amount,
        }
    }
}

fn describe_reserves(pool: &Pool) -> String {
    pool.reserves()
        .iter()
        .map(|r| format!("{} {}", r.balance(), r.asset()))
        .collect::<Vec<_>>()
        .join(" / ")
}
