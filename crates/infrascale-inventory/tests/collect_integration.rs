use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::{Value, json};

use infrascale_inventory::ansible::render_list;
use infrascale_inventory::*;

// Mock implementations
enum Failure {
    Unreachable,
    MissingDatabase,
    CursorBreaks,
    Hangs,
}

struct BrokenSource {
    failure: Failure,
    queries: AtomicUsize,
}

impl BrokenSource {
    fn new(failure: Failure) -> Arc<Self> {
        Arc::new(Self {
            failure,
            queries: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DocumentSource for BrokenSource {
    async fn verify(&self) -> Result<(), InventoryError> {
        match self.failure {
            Failure::Unreachable => Err(InventoryError::ConnectionFailed(
                "unable to connect to mongodb://db:27017".to_string(),
            )),
            Failure::MissingDatabase => Err(InventoryError::DatabaseNotFound {
                uri: "mongodb://db:27017".to_string(),
                database: "infrastructure".to_string(),
            }),
            Failure::CursorBreaks => Ok(()),
            Failure::Hangs => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
        }
    }

    async fn targets(&self) -> Result<DocumentStream, InventoryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let first = TargetDocument::from_value(json!({"name": "web1"})).unwrap();
        Ok(stream::iter(vec![
            Ok(first),
            Err(InventoryError::QueryFailed("cursor killed".to_string())),
        ])
        .boxed())
    }

    fn source_type(&self) -> &'static str {
        "broken"
    }
}

fn store() -> Arc<MemorySource> {
    Arc::new(MemorySource::new(
        vec![
            json!({"name": "web1", "dc": "east", "groups": ["webservers"], "ansible_vars": {"tier": "front"}}),
            json!({"name": "web2", "dc": "west", "groups": ["webservers", "ghost"]}),
            json!({"name": "db1", "dc": "east", "groups": ["ghost"], "ansible_vars": {"role": "db"}}),
            json!({"dc": "east", "groups": ["webservers"]}),
            json!({"name": "cache1", "groups": []}),
        ],
        vec![
            json!({"name": "webservers", "ansible_vars": {"env": "prod"}}),
            json!({"name": "databases"}),
        ],
    ))
}

#[tokio::test]
async fn test_unreachable_store_aborts_build() {
    let source = BrokenSource::new(Failure::Unreachable);
    let result = InventoryCollector::new(source.clone(), BuildOptions::default())
        .collect()
        .await;

    assert!(matches!(result, Err(InventoryError::ConnectionFailed(_))));
    // no query after a failed connectivity check
    assert_eq!(source.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_database_aborts_build() {
    let source = BrokenSource::new(Failure::MissingDatabase);
    let err = InventoryCollector::new(source.clone(), BuildOptions::default())
        .collect()
        .await
        .unwrap_err();

    assert!(err.is_config_problem());
    assert_eq!(source.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cursor_failure_returns_no_partial_inventory() {
    let source = BrokenSource::new(Failure::CursorBreaks);
    let result = InventoryCollector::new(source, BuildOptions::default())
        .collect()
        .await;

    assert!(matches!(result, Err(InventoryError::QueryFailed(_))));
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let source = BrokenSource::new(Failure::Hangs);
    let result = InventoryCollector::new(source, BuildOptions::default())
        .with_timeout(Duration::from_millis(50))
        .collect()
        .await;

    assert!(matches!(result, Err(InventoryError::Timeout(_))));
}

#[tokio::test]
async fn test_full_pass_invariants() {
    let inventory = InventoryCollector::new(store(), BuildOptions::default())
        .collect()
        .await
        .unwrap();

    let names: Vec<&str> = inventory.hosts().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["cache1", "db1", "web1", "web2"]);

    // dangling references only drop that reference
    assert_eq!(
        inventory.host("web2").unwrap().groups.iter().collect::<Vec<_>>(),
        vec!["webservers"]
    );
    assert!(inventory.host("db1").unwrap().is_ungrouped());
    assert!(inventory.host("cache1").unwrap().is_ungrouped());

    for (_, host) in inventory.hosts() {
        assert!(!host.groups.is_empty());
        if host.groups.iter().any(|g| g != UNGROUPED) {
            assert!(!host.groups.contains(UNGROUPED));
        }
    }
    assert!(inventory.dangling_memberships().is_empty());
    assert!(!inventory.groups.contains_key(UNGROUPED));

    // only referenced groups are materialized
    let groups: Vec<&str> = inventory.groups().map(|(name, _)| name).collect();
    assert_eq!(groups, vec!["webservers"]);
}

#[tokio::test]
async fn test_shards_partition_the_store() {
    let east = InventoryCollector::new(
        store(),
        BuildOptions::default().with_shard(ShardConfig::new("dc", "east")),
    )
    .collect()
    .await
    .unwrap();
    let west = InventoryCollector::new(
        store(),
        BuildOptions::default().with_shard(ShardConfig::new("dc", "west")),
    )
    .collect()
    .await
    .unwrap();

    assert_eq!(east.hosts.keys().collect::<Vec<_>>(), vec!["db1", "web1"]);
    assert_eq!(west.hosts.keys().collect::<Vec<_>>(), vec!["web2"]);
    // documents without the shard key belong to no shard
    assert!(east.host("cache1").is_none() && west.host("cache1").is_none());
}

#[tokio::test]
async fn test_repeated_builds_are_identical() {
    let collector = InventoryCollector::new(store(), BuildOptions::default());
    let first = collector.collect().await.unwrap();
    let second = collector.collect().await.unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(
        render_list(&first).to_string(),
        render_list(&second).to_string()
    );
}

#[tokio::test]
async fn test_reference_scenario() {
    let source = Arc::new(MemorySource::new(
        vec![
            json!({"name": "web1", "groups": ["webservers"], "ansible_vars": {"tier": "front"}}),
            json!({"name": "orphan"}),
        ],
        vec![json!({"name": "webservers", "ansible_vars": {"env": "prod"}})],
    ));
    let inventory = InventoryCollector::new(source, BuildOptions::default())
        .collect()
        .await
        .unwrap();

    let expected: Value = json!({
        "hosts": {
            "orphan": {"groups": ["ungrouped"]},
            "web1": {"vars": {"tier": "front"}, "groups": ["webservers"]}
        },
        "groups": {"webservers": {"vars": {"env": "prod"}}}
    });
    assert_eq!(serde_json::to_value(&inventory).unwrap(), expected);
}
