//! MongoDB document source

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::Client;
use mongodb::bson::{Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use tracing::{debug, info, instrument, warn};

use crate::config::SourceConfig;
use crate::error::InventoryError;
use crate::pipeline::{Pipeline, pipelines};
use crate::source::{DocumentSource, DocumentStream};
use crate::types::TargetDocument;

/// Document source backed by a MongoDB deployment
///
/// Holds one client for the lifetime of a build. Call [`MongoSource::close`]
/// once the build is done, whatever its outcome.
pub struct MongoSource {
    client: Client,
    /// URI with credentials removed, for logs and errors
    display_uri: String,
    database: String,
    collection: String,
    pipeline: Pipeline,
}

impl MongoSource {
    /// Create a client for the configured endpoint
    ///
    /// No round trip happens here except SRV resolution for `mongodb+srv` URIs.
    ///
    /// # Errors
    /// Returns `ConfigError` if the URI is malformed and `ConnectionFailed` if
    /// it cannot be resolved.
    #[instrument(skip(config), fields(database = %config.database, collection = %config.collection))]
    pub async fn connect(config: &SourceConfig) -> Result<Self, InventoryError> {
        let display_uri = redact_uri(&config.url);

        let mut options = ClientOptions::parse(config.url.as_str())
            .await
            .map_err(|e| map_client_error(&display_uri, &e))?;
        options.app_name = Some("infrascale".to_string());
        options.connect_timeout = Some(config.timeout);
        options.server_selection_timeout = Some(config.timeout);

        let client =
            Client::with_options(options).map_err(|e| map_client_error(&display_uri, &e))?;

        debug!(uri = %display_uri, "client created");

        Ok(Self {
            client,
            display_uri,
            database: config.database.clone(),
            collection: config.collection.clone(),
            pipeline: pipelines::targets_with_groups(
                &config.groups_collection,
                &config.groups_attr,
            ),
        })
    }

    /// Shut the client down and release its connections
    pub async fn close(self) {
        debug!(uri = %self.display_uri, "closing client");
        self.client.shutdown().await;
    }
}

#[async_trait]
impl DocumentSource for MongoSource {
    #[instrument(skip(self), fields(uri = %self.display_uri, database = %self.database))]
    async fn verify(&self) -> Result<(), InventoryError> {
        let names = self
            .client
            .list_database_names()
            .await
            .map_err(|e| map_client_error(&self.display_uri, &e))?;

        if names.iter().any(|n| n == &self.database) {
            debug!("database present");
            Ok(())
        } else {
            warn!("connected, but database does not exist");
            Err(InventoryError::DatabaseNotFound {
                uri: self.display_uri.clone(),
                database: self.database.clone(),
            })
        }
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn targets(&self) -> Result<DocumentStream, InventoryError> {
        debug!(pipeline = %self.pipeline, "running aggregation");

        let cursor = self
            .client
            .database(&self.database)
            .collection::<Document>(&self.collection)
            .aggregate(self.pipeline.build())
            .await
            .map_err(|e| map_client_error(&self.display_uri, &e))?;

        info!("aggregation started");

        Ok(cursor
            .map(|item| {
                item.map_err(|e| InventoryError::QueryFailed(e.to_string()))
                    .and_then(to_target)
            })
            .boxed())
    }

    fn source_type(&self) -> &'static str {
        "mongodb"
    }
}

/// Convert a BSON document to its relaxed extended JSON form
fn to_target(doc: Document) -> Result<TargetDocument, InventoryError> {
    TargetDocument::from_value(Bson::Document(doc).into_relaxed_extjson())
        .ok_or_else(|| InventoryError::QueryFailed("document is not an object".to_string()))
}

/// Map driver errors onto the inventory error taxonomy
fn map_client_error(uri: &str, error: &MongoError) -> InventoryError {
    match error.kind.as_ref() {
        ErrorKind::InvalidArgument { message, .. } => {
            InventoryError::ConfigError(format!("invalid connection string {uri}: {message}"))
        }
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => {
            InventoryError::ConnectionFailed(format!("unable to connect to {uri}: {error}"))
        }
        ErrorKind::Authentication { .. } => {
            InventoryError::ConnectionFailed(format!("authentication to {uri} failed: {error}"))
        }
        _ => InventoryError::QueryFailed(error.to_string()),
    }
}

/// Strip user credentials from a connection string
#[must_use]
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => uri.to_string(),
    }
}
