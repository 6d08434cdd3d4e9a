//! Configuration loading and types

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use infrascale_inventory::{ShardConfig, SourceOptions};
use serde::{Deserialize, Serialize};

/// Environment variable pointing at the config file
pub const CONFIG_ENV: &str = "INFRASCALE_CONFIG";

/// Top-level configuration for the inventory executable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Document store settings
    #[serde(default)]
    pub source: SourceOptions,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format on stderr
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Source settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    /// Connection URI
    pub url: Option<String>,
    /// Database name
    pub database: Option<String>,
    /// Target collection
    pub collection: Option<String>,
    /// Shard key and value
    pub shard: Option<(String, String)>,
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("cannot parse {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Load from default paths or use defaults
    ///
    /// Returns the path the configuration came from, if any.
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        for path in default_paths() {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }

    /// Apply command line overrides on top of file values
    pub fn apply(&mut self, overrides: SourceOverrides) {
        if overrides.url.is_some() {
            self.source.url = overrides.url;
        }
        if overrides.database.is_some() {
            self.source.database = overrides.database;
        }
        if overrides.collection.is_some() {
            self.source.collection = overrides.collection;
        }
        if let Some((key, val)) = overrides.shard {
            self.source.shard = Some(ShardConfig::new(key, val));
        }
    }
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("infrascale.toml"),
        PathBuf::from("/etc/infrascale/infrascale.toml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("infrascale/infrascale.toml"));
    }
    paths
}
