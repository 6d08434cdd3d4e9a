//! Ansible dynamic inventory rendering
//!
//! Produces the JSON shapes an inventory executable prints for `--list` and
//! `--host <name>`.

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::types::{Inventory, UNGROUPED, Variables};

/// Group Ansible treats as the parent of every other group
pub const ALL: &str = "all";

/// Reserved key carrying host variables
pub const META: &str = "_meta";

/// Render the `--list` document
///
/// Host variables go under `_meta.hostvars` so Ansible never has to call back
/// with `--host`. `ungrouped` is listed only when it has members.
#[must_use]
pub fn render_list(inventory: &Inventory) -> Value {
    let mut out = Map::new();
    let mut children = Vec::new();

    let hostvars: Map<String, Value> = inventory
        .hosts()
        .map(|(name, host)| (name.to_string(), Value::Object(host.vars.clone())))
        .collect();
    out.insert(META.to_string(), json!({ "hostvars": hostvars }));

    let mut all = Map::new();

    for (name, group) in inventory.groups() {
        if name == META {
            warn!(group = %name, "group name is reserved, leaving it out of the listing");
            continue;
        }

        let hosts: Vec<&str> = inventory.members(name).collect();

        if name == ALL {
            if !group.vars.is_empty() {
                all.insert("vars".to_string(), Value::Object(group.vars.clone()));
            }
            if !hosts.is_empty() {
                all.insert("hosts".to_string(), json!(hosts));
            }
            continue;
        }

        out.insert(name.to_string(), group_entry(&hosts, &group.vars));
        children.push(name.to_string());
    }

    let ungrouped: Vec<&str> = inventory.members(UNGROUPED).collect();
    if !ungrouped.is_empty() {
        out.insert(UNGROUPED.to_string(), json!({ "hosts": ungrouped }));
        children.push(UNGROUPED.to_string());
    }

    children.sort();
    all.insert("children".to_string(), json!(children));
    out.insert(ALL.to_string(), Value::Object(all));

    Value::Object(out)
}

fn group_entry(hosts: &[&str], vars: &Variables) -> Value {
    let mut entry = Map::new();
    entry.insert("hosts".to_string(), json!(hosts));
    if !vars.is_empty() {
        entry.insert("vars".to_string(), Value::Object(vars.clone()));
    }
    Value::Object(entry)
}

/// Render the `--host <name>` document
///
/// Unknown hosts yield an empty mapping.
#[must_use]
pub fn render_host(inventory: &Inventory, name: &str) -> Value {
    inventory
        .host(name)
        .map_or_else(|| json!({}), |host| Value::Object(host.vars.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::config::BuildOptions;
    use crate::types::TargetDocument;

    fn inventory(docs: Vec<Value>) -> Inventory {
        let docs: Vec<TargetDocument> = docs
            .into_iter()
            .filter_map(TargetDocument::from_value)
            .collect();
        build(BuildOptions::default(), &docs)
    }

    #[test]
    fn test_render_list() {
        let inv = inventory(vec![
            json!({
                "name": "web1",
                "ansible_vars": {"tier": "front"},
                "groups": [{"name": "webservers", "ansible_vars": {"env": "prod"}}]
            }),
            json!({"name": "web2", "groups": [{"name": "webservers"}, {"name": "edge"}]}),
            json!({"name": "orphan"}),
        ]);

        assert_eq!(
            render_list(&inv),
            json!({
                "_meta": {"hostvars": {
                    "orphan": {},
                    "web1": {"tier": "front"},
                    "web2": {}
                }},
                "all": {"children": ["edge", "ungrouped", "webservers"]},
                "edge": {"hosts": ["web2"]},
                "webservers": {"hosts": ["web1", "web2"], "vars": {"env": "prod"}},
                "ungrouped": {"hosts": ["orphan"]}
            })
        );
    }

    #[test]
    fn test_render_list_without_ungrouped() {
        let inv = inventory(vec![json!({"name": "db1", "groups": [{"name": "db"}]})]);
        let out = render_list(&inv);
        assert!(out.get(UNGROUPED).is_none());
        assert_eq!(out["all"]["children"], json!(["db"]));
    }

    #[test]
    fn test_render_list_empty() {
        let out = render_list(&Inventory::new());
        assert_eq!(
            out,
            json!({"_meta": {"hostvars": {}}, "all": {"children": []}})
        );
    }

    #[test]
    fn test_group_named_all_merges_into_all() {
        let inv = inventory(vec![json!({
            "name": "h",
            "groups": [{"name": "all", "ansible_vars": {"ntp": "pool.ntp.org"}}]
        })]);
        let out = render_list(&inv);
        assert_eq!(
            out["all"],
            json!({"children": [], "hosts": ["h"], "vars": {"ntp": "pool.ntp.org"}})
        );
    }

    #[test]
    fn test_group_named_meta_keeps_hostvars() {
        let inv = inventory(vec![json!({
            "name": "web1",
            "ansible_vars": {"tier": "front"},
            "groups": [{"name": "_meta", "ansible_vars": {"x": 1}}, {"name": "web"}]
        })]);
        let out = render_list(&inv);
        assert_eq!(out[META], json!({"hostvars": {"web1": {"tier": "front"}}}));
        assert_eq!(out["all"]["children"], json!(["web"]));
    }

    #[test]
    fn test_render_host() {
        let inv = inventory(vec![json!({"name": "web1", "ansible_vars": {"role": "db"}})]);
        assert_eq!(render_host(&inv, "web1"), json!({"role": "db"}));
        assert_eq!(render_host(&inv, "nope"), json!({}));
    }
}
