//! Projection of raw target documents into the normalized inventory

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::BuildOptions;
use crate::types::{Group, Host, Inventory, NAME_FIELD, TargetDocument, UNGROUPED, VARS_FIELD, Variables};

/// What happened to a single document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A new host entry was created
    Added,
    /// An existing host entry with the same name was overwritten
    Replaced,
    /// The document has no usable `name`
    SkippedUnnamed,
    /// The document is outside the configured shard
    SkippedShard,
}

/// Counters for one build pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Documents offered to the builder
    pub seen: usize,
    /// Documents that produced or replaced a host
    pub admitted: usize,
    /// Documents skipped for lacking a name
    pub skipped_unnamed: usize,
    /// Documents skipped by the shard predicate
    pub skipped_shard: usize,
    /// Hosts overwritten by a later document with the same name
    pub replaced: usize,
}

/// Inventory builder
///
/// Owns the one inventory being built. Create a fresh builder per build pass;
/// it performs no I/O.
#[derive(Debug)]
pub struct InventoryBuilder {
    options: BuildOptions,
    inventory: Inventory,
    stats: BuildStats,
}

impl InventoryBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            inventory: Inventory::new(),
            stats: BuildStats::default(),
        }
    }

    /// Feed one document, in source order
    pub fn push(&mut self, doc: &TargetDocument) -> Admission {
        self.stats.seen += 1;

        let Some(name) = doc.name() else {
            debug!("skipping document without a name");
            self.stats.skipped_unnamed += 1;
            return Admission::SkippedUnnamed;
        };

        if let Some(shard) = &self.options.shard
            && !shard.matches(doc)
        {
            debug!(host = %name, "outside shard, skipping");
            self.stats.skipped_shard += 1;
            return Admission::SkippedShard;
        }

        let mut host = Host {
            vars: self.host_vars(name, doc),
            groups: BTreeSet::new(),
        };

        for group_doc in doc.resolved_groups() {
            let Some(group_name) = group_doc.get(NAME_FIELD).and_then(Value::as_str) else {
                trace!(host = %name, "ignoring resolved group without a name");
                continue;
            };

            if group_name == UNGROUPED {
                if group_doc.contains_key(VARS_FIELD) {
                    warn!(host = %name, "variables on group '{UNGROUPED}' are ignored");
                }
                continue;
            }

            host.groups.insert(group_name.to_string());

            let vars = group_doc
                .get(VARS_FIELD)
                .and_then(|v| as_variables(v, group_name))
                .unwrap_or_default();
            self.inventory
                .groups
                .insert(group_name.to_string(), Group { vars });
        }

        if host.groups.is_empty() {
            host.groups.insert(UNGROUPED.to_string());
        }

        self.stats.admitted += 1;
        if self.inventory.hosts.insert(name.to_string(), host).is_some() {
            debug!(host = %name, "duplicate host name, later document wins");
            self.stats.replaced += 1;
            Admission::Replaced
        } else {
            trace!(host = %name, "host added");
            Admission::Added
        }
    }

    /// Feed every document of an in-memory sequence
    pub fn extend<'a>(&mut self, docs: impl IntoIterator<Item = &'a TargetDocument>) {
        for doc in docs {
            self.push(doc);
        }
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Finish the build
    #[must_use]
    pub fn finish(self) -> Inventory {
        self.inventory
    }

    /// Finish the build, keeping the counters
    #[must_use]
    pub fn finish_with_stats(self) -> (Inventory, BuildStats) {
        (self.inventory, self.stats)
    }

    /// Host variables: exposed attributes first, then `ansible_vars` on top
    fn host_vars(&self, name: &str, doc: &TargetDocument) -> Variables {
        let mut vars = Variables::new();

        for attr in &self.options.attrs {
            if let Some(value) = doc.get(attr) {
                vars.insert(attr.clone(), value.clone());
            }
        }

        if let Some(own) = doc.vars().and_then(|v| as_variables(v, name)) {
            if vars.is_empty() {
                return own;
            }
            vars.extend(own);
        }

        vars
    }
}

/// Copy a variables value, treating anything but a mapping as absent
fn as_variables(value: &Value, owner: &str) -> Option<Variables> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::Null => None,
        other => {
            warn!(owner = %owner, kind = %kind_of(other), "'{VARS_FIELD}' is not a mapping, ignoring");
            None
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build an inventory from an in-memory sequence in one call
#[must_use]
pub fn build<'a>(
    options: BuildOptions,
    docs: impl IntoIterator<Item = &'a TargetDocument>,
) -> Inventory {
    let mut builder = InventoryBuilder::new(options);
    builder.extend(docs);
    builder.finish()
}
