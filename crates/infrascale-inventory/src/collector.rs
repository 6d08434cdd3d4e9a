//! High-level inventory collection API

use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use tracing::{debug, info, instrument};

use crate::builder::{BuildStats, InventoryBuilder};
use crate::config::BuildOptions;
use crate::error::InventoryError;
use crate::source::DocumentSource;
use crate::types::Inventory;

/// Inventory collector
///
/// Runs one build pass: verify the source, stream its documents through a
/// fresh builder, return the finished inventory. Any source failure aborts
/// the pass and no partial inventory is returned.
pub struct InventoryCollector {
    source: Arc<dyn DocumentSource>,
    options: BuildOptions,
    timeout: Duration,
}

impl InventoryCollector {
    /// Create a new inventory collector
    pub fn new(source: Arc<dyn DocumentSource>, options: BuildOptions) -> Self {
        Self {
            source,
            options,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the budget for the whole store round trip
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Collect the inventory
    ///
    /// # Errors
    /// Returns the source's error if verification, the query or the cursor
    /// fails, or `Timeout` if the round trip exceeds the configured budget.
    pub async fn collect(&self) -> Result<Inventory, InventoryError> {
        self.collect_with_stats().await.map(|(inventory, _)| inventory)
    }

    /// Collect the inventory along with build counters
    ///
    /// # Errors
    /// Same as [`InventoryCollector::collect`].
    #[instrument(skip(self), fields(source = self.source.source_type()))]
    pub async fn collect_with_stats(&self) -> Result<(Inventory, BuildStats), InventoryError> {
        info!(sharded = self.options.shard.is_some(), "collecting inventory");

        let (inventory, stats) = tokio::time::timeout(self.timeout, self.run())
            .await
            .map_err(|_| InventoryError::Timeout(self.timeout))??;

        info!(
            hosts = inventory.hosts.len(),
            groups = inventory.groups.len(),
            seen = stats.seen,
            skipped_shard = stats.skipped_shard,
            skipped_unnamed = stats.skipped_unnamed,
            replaced = stats.replaced,
            "inventory collection completed"
        );

        Ok((inventory, stats))
    }

    async fn run(&self) -> Result<(Inventory, BuildStats), InventoryError> {
        self.source.verify().await?;
        debug!("source verified");

        let mut builder = InventoryBuilder::new(self.options.clone());
        let mut docs = self.source.targets().await?;
        while let Some(doc) = docs.try_next().await? {
            builder.push(&doc);
        }

        Ok(builder.finish_with_stats())
    }
}
