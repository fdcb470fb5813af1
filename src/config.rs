//! Configuration file handling.
//!
//! A `credvault.toml` looks like:
//!
//! ```toml
//! database = "vault.db"
//! field_policy = "declared-only"
//! log_level = "info"
//! ```
//!
//! Relative database paths are resolved against the directory holding the
//! configuration file.

use crate::error::{Result, VaultError};
use crate::utils;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Database file used when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "credvault.db";

/// Whether entries may carry fields their template does not declare.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FieldPolicy {
    /// Undeclared fields are accepted and carry no validators.
    #[default]
    Open,
    /// Undeclared fields are rejected.
    DeclaredOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: PathBuf,
    pub field_policy: FieldPolicy,
    /// Default tracing filter, overridden by `RUST_LOG`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            field_policy: FieldPolicy::default(),
            log_level: None,
        }
    }
}

impl Config {
    /// Parse a configuration document.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| VaultError::Config(e.to_string()))
    }

    /// Load a configuration file, resolving the database path against it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VaultError::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)
            .map_err(|e| VaultError::Config(format!("{}: {e}", path.display())))?;

        if config.database.is_relative() {
            if let Some(dir) = path.parent() {
                config.database = dir.join(&config.database);
            }
        }
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the active configuration.
    ///
    /// An explicit path must exist. Otherwise the current directory and its
    /// parents are searched, then the user config directory; defaults apply
    /// when nothing is found.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = utils::find_config_file() {
            return Self::load(&path);
        }
        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load(&path);
        }
        Ok(Self::default())
    }

    /// `<config_dir>/credvault/credvault.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("credvault").join(utils::CONFIG_FILE_NAMES[0]))
    }

    /// Serialize for `init`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VaultError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE));
        assert_eq!(config.field_policy, FieldPolicy::Open);
    }

    #[test]
    fn test_parse_policy() {
        let config =
            Config::parse("field_policy = \"declared-only\"\nlog_level = \"debug\"").unwrap();
        assert_eq!(config.field_policy, FieldPolicy::DeclaredOnly);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(matches!(
            Config::parse("databse = \"x.db\""),
            Err(VaultError::Config(_))
        ));
        assert!(Config::parse("field_policy = \"strict\"").is_err());
    }

    #[test]
    fn test_load_resolves_relative_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credvault.toml");
        std::fs::write(&path, "database = \"data/vault.db\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database, dir.path().join("data/vault.db"));
    }

    #[test]
    fn test_explicit_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::discover(Some(&missing)),
            Err(VaultError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_toml_round_trip_for_init() {
        let config = Config {
            database: PathBuf::from("vault.db"),
            field_policy: FieldPolicy::DeclaredOnly,
            log_level: Some("info".to_string()),
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("field_policy = \"declared-only\""));
        assert_eq!(Config::parse(&text).unwrap(), config);
    }
}
