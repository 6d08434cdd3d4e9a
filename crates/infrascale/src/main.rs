//! infrascale inventory executable
//!
//! Ansible dynamic inventory backed by MongoDB. Prints the inventory as JSON
//! on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use infrascale_inventory::ansible::{render_host, render_list};
use infrascale_inventory::{Inventory, InventoryCollector, MongoSource, SourceConfig};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, LogFormat, SourceOverrides};

/// Ansible dynamic inventory from MongoDB
#[derive(Parser, Debug)]
#[command(name = "infrascale", version, about)]
struct Args {
    /// Print the whole inventory (default)
    #[arg(long, conflicts_with_all = ["host", "normalized"])]
    list: bool,

    /// Print the variables of one host
    #[arg(long, value_name = "NAME", conflicts_with = "normalized")]
    host: Option<String>,

    /// Print the normalized host/group model instead of Ansible's format
    #[arg(long)]
    normalized: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Config file (defaults to $INFRASCALE_CONFIG, ./infrascale.toml, ...)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Document store URI
    #[arg(long)]
    url: Option<String>,

    /// Database holding the inventory
    #[arg(long)]
    database: Option<String>,

    /// Collection holding target documents
    #[arg(long)]
    collection: Option<String>,

    /// Only include targets whose KEY attribute equals --shard-val
    #[arg(long, value_name = "KEY", requires = "shard_val")]
    shard_key: Option<String>,

    /// Shard value, compared as a string
    #[arg(long, value_name = "VAL", requires = "shard_key")]
    shard_val: Option<String>,

    /// Log level or filter directive, overridden by RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

/// What to print
#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    List,
    Host(String),
    Normalized,
}

impl Args {
    fn output(&self) -> Output {
        match (&self.host, self.normalized) {
            (Some(host), _) => Output::Host(host.clone()),
            (None, true) => Output::Normalized,
            (None, false) => Output::List,
        }
    }

    fn overrides(&self) -> SourceOverrides {
        SourceOverrides {
            url: self.url.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            shard: self.shard_key.clone().zip(self.shard_val.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let (mut config, loaded_from) = match &args.config {
        Some(path) => (Config::load(path)?, Some(path.clone())),
        None => Config::load_default()?,
    };
    config.apply(args.overrides());

    init_tracing(
        args.log_level.as_deref().unwrap_or(&config.log.level),
        args.log_format.unwrap_or(config.log.format),
    )?;

    match &loaded_from {
        Some(path) => debug!(path = %path.display(), "loaded configuration"),
        None => debug!("no config file found, using command line options"),
    }

    // Presence checks happen here, before any store access
    let source_config = SourceConfig::try_from(config.source)?;
    let inventory = collect(&source_config).await?;

    let value = match args.output() {
        Output::List => render_list(&inventory),
        Output::Host(name) => render_host(&inventory, &name),
        Output::Normalized => serde_json::to_value(&inventory)?,
    };
    println!("{}", to_json(&value, args.pretty)?);

    Ok(())
}

/// Run one collection, releasing the store connection on every path
async fn collect(config: &SourceConfig) -> Result<Inventory> {
    let source = Arc::new(MongoSource::connect(config).await?);
    info!(
        database = %config.database,
        collection = %config.collection,
        "connected"
    );

    // the driver bounds each round trip by `timeout`; verify, query and
    // cursor drain together get three of them
    let result = InventoryCollector::new(source.clone(), config.build_options())
        .with_timeout(config.timeout * 3)
        .collect()
        .await;

    if let Some(source) = Arc::into_inner(source) {
        source.close().await;
    }

    Ok(result?)
}

fn to_json(value: &Value, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

/// Initialize logging on stderr, stdout carries the inventory
fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_output_is_list() {
        let args = Args::try_parse_from(["infrascale"]).unwrap();
        assert_eq!(args.output(), Output::List);
        let args = Args::try_parse_from(["infrascale", "--list"]).unwrap();
        assert_eq!(args.output(), Output::List);
    }

    #[test]
    fn test_host_output() {
        let args = Args::try_parse_from(["infrascale", "--host", "web1"]).unwrap();
        assert_eq!(args.output(), Output::Host("web1".to_string()));
        assert!(Args::try_parse_from(["infrascale", "--list", "--host", "web1"]).is_err());
    }

    #[test]
    fn test_shard_flags_come_in_pairs() {
        assert!(Args::try_parse_from(["infrascale", "--shard-key", "dc"]).is_err());

        let args =
            Args::try_parse_from(["infrascale", "--shard-key", "dc", "--shard-val", "east"])
                .unwrap();
        assert_eq!(
            args.overrides().shard,
            Some(("dc".to_string(), "east".to_string()))
        );
    }

    #[test]
    fn test_log_format_flag() {
        let args = Args::try_parse_from(["infrascale", "--log-format", "json"]).unwrap();
        assert_eq!(args.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_to_json() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(to_json(&value, false).unwrap(), r#"{"a":1}"#);
        assert!(to_json(&value, true).unwrap().contains('\n'));
    }
}
