//! Inventory type definitions

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Implicit group for hosts without any resolved group membership
pub const UNGROUPED: &str = "ungrouped";

/// Field holding a document's unique name
pub const NAME_FIELD: &str = "name";

/// Field holding host or group variables
pub const VARS_FIELD: &str = "ansible_vars";

/// Field the join writes resolved group documents into
pub const RESOLVED_GROUPS_FIELD: &str = "groups";

/// Variable mapping attached to hosts and groups
pub type Variables = Map<String, Value>;

// ============================================================================
// Raw documents
// ============================================================================

/// Raw target document as returned by a document source
///
/// Shape is not validated up front; accessors return `None` for missing or
/// mistyped fields and the builder decides what that means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetDocument(Map<String, Value>);

impl TargetDocument {
    /// Wrap a JSON object
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from any JSON value, `None` unless it is an object
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Document name, if present and a string
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get(NAME_FIELD).and_then(Value::as_str)
    }

    /// Top-level attribute lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Raw `ansible_vars` value, whatever its shape
    #[must_use]
    pub fn vars(&self) -> Option<&Value> {
        self.0.get(VARS_FIELD)
    }

    /// Resolved group documents attached by the join
    ///
    /// Entries that are not objects are dropped.
    pub fn resolved_groups(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.0
            .get(RESOLVED_GROUPS_FIELD)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }
}

// ============================================================================
// Normalized model
// ============================================================================

/// A managed host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// Host variables
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub vars: Variables,
    /// Names of groups this host belongs to
    pub groups: BTreeSet<String>,
}

impl Host {
    /// Check whether the host only carries the implicit group
    #[must_use]
    pub fn is_ungrouped(&self) -> bool {
        self.groups.len() == 1 && self.groups.contains(UNGROUPED)
    }
}

/// A host group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Group variables
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub vars: Variables,
}

/// Complete inventory produced by one build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Hosts keyed by name
    pub hosts: BTreeMap<String, Host>,
    /// Groups keyed by name, never containing the implicit group
    pub groups: BTreeMap<String, Group>,
}

impl Inventory {
    /// Create new empty inventory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate hosts in name order
    pub fn hosts(&self) -> impl Iterator<Item = (&str, &Host)> {
        self.hosts.iter().map(|(name, host)| (name.as_str(), host))
    }

    /// Iterate groups in name order
    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.groups.iter().map(|(name, group)| (name.as_str(), group))
    }

    /// Get a host by name
    #[must_use]
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    /// Names of hosts belonging to `group`, in name order
    ///
    /// Works for the implicit group as well.
    pub fn members<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.hosts
            .iter()
            .filter(move |(_, host)| host.groups.contains(group))
            .map(|(name, _)| name.as_str())
    }

    /// Check if the inventory holds no hosts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Membership references that point at no known group
    ///
    /// Always empty for an inventory produced by the builder.
    #[must_use]
    pub fn dangling_memberships(&self) -> Vec<(&str, &str)> {
        self.hosts
            .iter()
            .flat_map(|(name, host)| {
                host.groups
                    .iter()
                    .filter(|g| g.as_str() != UNGROUPED && !self.groups.contains_key(*g))
                    .map(move |g| (name.as_str(), g.as_str()))
            })
            .collect()
    }
}
