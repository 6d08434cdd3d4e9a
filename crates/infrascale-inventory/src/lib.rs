//! infrascale-inventory: Ansible inventory from a document store
//!
//! Reads target documents, resolves their group memberships through a join,
//! applies an optional shard predicate and projects the result into hosts,
//! groups and variables.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use infrascale_inventory::{InventoryCollector, MongoSource, SourceConfig, SourceOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SourceConfig::try_from(SourceOptions {
//!     url: Some("mongodb://localhost:27017".to_string()),
//!     database: Some("infrastructure".to_string()),
//!     collection: Some("targets".to_string()),
//!     ..SourceOptions::default()
//! })?;
//!
//! let source = Arc::new(MongoSource::connect(&config).await?);
//! let result = InventoryCollector::new(source.clone(), config.build_options())
//!     .collect()
//!     .await;
//! if let Some(source) = Arc::into_inner(source) {
//!     source.close().await;
//! }
//!
//! for (name, host) in result?.hosts() {
//!     println!("{name}: {:?}", host.groups);
//! }
//! # Ok(())
//! # }
//! ```

pub mod ansible;
pub mod builder;
pub mod collector;
pub mod config;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod pipeline;
pub mod source;
pub mod types;

pub use builder::{Admission, BuildStats, InventoryBuilder};
pub use collector::InventoryCollector;
pub use config::{BuildOptions, ShardConfig, SourceConfig, SourceOptions};
pub use error::InventoryError;
pub use memory::MemorySource;
pub use mongo::MongoSource;
pub use source::{DocumentSource, DocumentStream};
pub use types::{Group, Host, Inventory, TargetDocument, UNGROUPED, Variables};
