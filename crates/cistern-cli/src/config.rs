// crates/cistern-cli/src/config.rs
//
// Runtime configuration for the Cistern CLI.
// Loaded from a TOML file or populated with sensible defaults.

use cistern_pool::DepositPolicy;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Path of the ledger snapshot (registry, wallets, share holdings).
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Path of the exported admin capability. Defaults to the state file
    /// path with `.admin` appended.
    #[serde(default)]
    pub capability_file: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deposit policy for dual-asset pools created in a fresh registry.
    #[serde(default)]
    pub default_deposit_policy: DepositPolicy,

    /// Print JSON instead of tables.
    #[serde(default)]
    pub json_output: bool,
}

fn default_state_file() -> String {
    "~/.cistern/ledger.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            capability_file: None,
            log_level: default_log_level(),
            default_deposit_policy: DepositPolicy::default(),
            json_output: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(expand_tilde(path))?;
        let config: CliConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(expand_tilde(&self.state_file))
    }

    pub fn capability_path(&self) -> PathBuf {
        match &self.capability_file {
            Some(path) => PathBuf::from(expand_tilde(path)),
            None => PathBuf::from(format!("{}.admin", expand_tilde(&self.state_file))),
        }
    }
}

/// Replace a leading `~/` with the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_deposit_policy, DepositPolicy::PrimaryOnly);
        assert!(!config.json_output);
        assert!(config.state_file.ends_with("ledger.json"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            state_file = "/tmp/cistern/ledger.json"
            default_deposit_policy = "simultaneous"
            "#,
        )
        .unwrap();
        assert_eq!(config.state_file, "/tmp/cistern/ledger.json");
        assert_eq!(config.default_deposit_policy, DepositPolicy::Simultaneous);
        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.capability_path(),
            PathBuf::from("/tmp/cistern/ledger.json.admin")
        );
    }

    #[test]
    fn test_explicit_capability_path() {
        let config: CliConfig = toml::from_str(r#"capability_file = "/keys/cap.json""#).unwrap();
        assert_eq!(config.capability_path(), PathBuf::from("/keys/cap.json"));
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        assert_eq!(expand_tilde("/abs/path"), "/abs/path");
        assert_eq!(expand_tilde("relative"), "relative");
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(toml::from_str::<CliConfig>(r#"default_deposit_policy = "maybe""#).is_err());
    }
}
