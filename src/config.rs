use crate::core::db::NamingConvention;
use crate::core::{DocketError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schema: NamingConvention,
}

/// SQLite connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<String>) -> Self {
        DatabaseConfig {
            path: path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: default_foreign_keys(),
            read_only: false,
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_foreign_keys() -> bool {
    true
}

impl Config {
    /// Configuration for `path` with every other setting defaulted.
    pub fn for_database(path: impl Into<String>) -> Self {
        Config {
            database: DatabaseConfig::new(path),
            schema: NamingConvention::default(),
        }
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).map_err(|e| DocketError::Config(e.to_string()))?;
    config.schema.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = docket::config::load_config("docket.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Default location of the configuration file, `<config dir>/docket/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docket").join("config.toml"))
}
