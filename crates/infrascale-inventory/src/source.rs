//! Document source trait

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::InventoryError;
use crate::types::TargetDocument;

/// Lazy, single-pass sequence of raw target documents
pub type DocumentStream = BoxStream<'static, Result<TargetDocument, InventoryError>>;

/// Backing store that yields target documents with resolved groups
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Check connectivity and that the configured database exists
    async fn verify(&self) -> Result<(), InventoryError>;

    /// Every document carrying a `name`, with its `groups` resolved
    async fn targets(&self) -> Result<DocumentStream, InventoryError>;

    /// Short identifier used in logs
    fn source_type(&self) -> &'static str;
}
