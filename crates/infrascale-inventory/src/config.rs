//! Source and build configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::InventoryError;
use crate::types::TargetDocument;

/// Source options as read from a config file or command line
///
/// Every field is optional here; [`SourceConfig::try_from`] performs the
/// presence checks once, before any store access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceOptions {
    /// Connection URI of the document store
    pub url: Option<String>,
    /// Logical database name
    pub database: Option<String>,
    /// Collection holding target documents
    pub collection: Option<String>,
    /// Collection holding group documents
    pub groups_collection: Option<String>,
    /// Target attribute holding group references
    pub groups_attr: Option<String>,
    /// Top-level target attributes exposed as host variables
    #[serde(default)]
    pub attrs: Vec<String>,
    /// Shard this controller is responsible for
    pub shard: Option<ShardConfig>,
    /// Store round-trip budget in seconds
    pub timeout_secs: Option<u64>,
}

/// Validated source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Connection URI of the document store
    pub url: String,
    /// Logical database name
    pub database: String,
    /// Collection holding target documents
    pub collection: String,
    /// Collection holding group documents
    pub groups_collection: String,
    /// Target attribute holding group references
    pub groups_attr: String,
    /// Top-level target attributes exposed as host variables
    pub attrs: Vec<String>,
    /// Shard this controller is responsible for
    pub shard: Option<ShardConfig>,
    /// Store round-trip budget
    pub timeout: Duration,
}

fn default_groups_collection() -> String {
    "groups".to_string()
}

fn default_groups_attr() -> String {
    "groups".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn required(value: Option<String>, option: &str) -> Result<String, InventoryError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(InventoryError::ConfigError(format!(
            "required option '{option}' is missing"
        ))),
    }
}

fn non_empty_or(value: Option<String>, default: fn() -> String) -> String {
    value.filter(|v| !v.trim().is_empty()).unwrap_or_else(default)
}

impl TryFrom<SourceOptions> for SourceConfig {
    type Error = InventoryError;

    fn try_from(options: SourceOptions) -> Result<Self, Self::Error> {
        let url = required(options.url, "url")?;
        let database = required(options.database, "database")?;
        let collection = required(options.collection, "collection")?;

        if let Some(shard) = &options.shard
            && shard.key.trim().is_empty()
        {
            return Err(InventoryError::ConfigError(
                "shard key must not be empty".to_string(),
            ));
        }

        let timeout = match options.timeout_secs {
            Some(0) => {
                return Err(InventoryError::ConfigError(
                    "timeout_secs must be greater than zero".to_string(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => default_timeout(),
        };

        Ok(Self {
            url,
            database,
            collection,
            groups_collection: non_empty_or(options.groups_collection, default_groups_collection),
            groups_attr: non_empty_or(options.groups_attr, default_groups_attr),
            attrs: options.attrs,
            shard: options.shard,
            timeout,
        })
    }
}

impl SourceConfig {
    /// Options the builder needs from this configuration
    #[must_use]
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            shard: self.shard.clone(),
            attrs: self.attrs.clone(),
        }
    }
}

/// Shard predicate: documents must carry `key` with a value equal to `val`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardConfig {
    /// Top-level document attribute to shard on
    pub key: String,
    /// Value this controller is responsible for
    pub val: Value,
}

impl ShardConfig {
    /// Create a new shard predicate
    pub fn new(key: impl Into<String>, val: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
        }
    }

    /// Check whether a document belongs to this shard
    #[must_use]
    pub fn matches(&self, doc: &TargetDocument) -> bool {
        match doc.get(&self.key) {
            Some(value) if values_match(value, &self.val) => {
                trace!(key = %self.key, val = %self.val, "shard matched");
                true
            }
            Some(value) => {
                debug!(key = %self.key, found = %value, "shard value mismatch");
                false
            }
            None => {
                debug!(key = %self.key, "shard key absent");
                false
            }
        }
    }
}

/// Equality used by the shard predicate
///
/// Numbers compare by value so `1` (int) and `1.0` (double) agree, which is
/// how the store itself compares them.
pub(crate) fn values_match(found: &Value, expected: &Value) -> bool {
    match (found, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => found == expected,
    }
}

/// Options consumed by the inventory builder
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Optional shard predicate
    pub shard: Option<ShardConfig>,
    /// Top-level target attributes exposed as host variables
    pub attrs: Vec<String>,
}

impl BuildOptions {
    /// Restrict the build to one shard
    #[must_use]
    pub fn with_shard(mut self, shard: ShardConfig) -> Self {
        self.shard = Some(shard);
        self
    }

    /// Expose top-level attributes as host variables
    #[must_use]
    pub fn with_attrs(mut self, attrs: &[&str]) -> Self {
        self.attrs = attrs.iter().map(|a| (*a).to_string()).collect();
        self
    }
}
