//! In-process document source

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::config::values_match;
use crate::error::InventoryError;
use crate::source::{DocumentSource, DocumentStream};
use crate::types::{NAME_FIELD, RESOLVED_GROUPS_FIELD, TargetDocument};

/// Document source over in-memory target and group documents
///
/// Applies the same match and outer join as the store pipeline: targets
/// without a `name` are dropped, and each target's group references are
/// replaced by the matching group documents in group collection order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    targets: Vec<Map<String, Value>>,
    groups: Vec<Map<String, Value>>,
    groups_attr: String,
}

impl MemorySource {
    /// Create a source joining on the `groups` attribute
    #[must_use]
    pub fn new(targets: Vec<Value>, groups: Vec<Value>) -> Self {
        Self {
            targets: objects(targets),
            groups: objects(groups),
            groups_attr: RESOLVED_GROUPS_FIELD.to_string(),
        }
    }

    /// Join on a different target attribute
    #[must_use]
    pub fn with_groups_attr(mut self, attr: impl Into<String>) -> Self {
        self.groups_attr = attr.into();
        self
    }

    /// Run the match and join, in target order
    #[must_use]
    pub fn resolve(&self) -> Vec<TargetDocument> {
        self.targets
            .iter()
            .filter(|t| t.contains_key(NAME_FIELD))
            .map(|target| {
                let resolved: Vec<Value> = self
                    .groups
                    .iter()
                    .filter(|group| joins(target.get(&self.groups_attr), group.get(NAME_FIELD)))
                    .cloned()
                    .map(Value::Object)
                    .collect();

                let mut fields = target.clone();
                fields.insert(RESOLVED_GROUPS_FIELD.to_string(), Value::Array(resolved));
                TargetDocument::new(fields)
            })
            .collect()
    }
}

/// Equi-join condition: arrays match on any element, numbers compare by
/// value, a missing local field matches a missing or null foreign field
fn joins(local: Option<&Value>, foreign: Option<&Value>) -> bool {
    let equals = |reference: &Value| match foreign {
        Some(name) => values_match(reference, name),
        None => reference.is_null(),
    };
    match local {
        Some(Value::Array(refs)) => refs.iter().any(equals),
        Some(value) => equals(value),
        None => foreign.is_none_or(Value::is_null),
    }
}

fn objects(values: Vec<Value>) -> Vec<Map<String, Value>> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn verify(&self) -> Result<(), InventoryError> {
        Ok(())
    }

    #[instrument(skip(self))]
    async fn targets(&self) -> Result<DocumentStream, InventoryError> {
        let docs = self.resolve();
        debug!(count = docs.len(), "serving in-memory targets");
        Ok(stream::iter(docs.into_iter().map(Ok)).boxed())
    }

    fn source_type(&self) -> &'static str {
        "memory"
    }
}
