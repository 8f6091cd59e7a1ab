use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use geoengineer::gps::{Context, Node, NodeId};
use geoengineer::providers::{Provider, ProviderError, RemoteEntry};
use geoengineer::resource::GEO_ID_KEY;
use geoengineer::{
    Generation, GenerationError, RemoteInventory, Resource, ResourceError, ResourceType,
};

/// Serves a fixed inventory slowly and counts how often it is asked.
struct SlowInventory {
    calls: AtomicUsize,
    entries: Vec<RemoteEntry>,
    fail_type: Option<&'static str>,
}

impl SlowInventory {
    fn new(entries: Vec<RemoteEntry>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            entries,
            fail_type: None,
        })
    }

    fn failing_for(resource_type: &'static str, entries: Vec<RemoteEntry>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            entries,
            fail_type: Some(resource_type),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for SlowInventory {
    fn name(&self) -> &str {
        "slow"
    }

    fn resource_types(&self) -> Vec<&str> {
        Vec::new()
    }

    async fn fetch_remote(&self, resource_type: &str) -> Result<Vec<RemoteEntry>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.fail_type == Some(resource_type) {
            return Err(ProviderError::Fetch(format!("{} unavailable", resource_type)));
        }
        Ok(self.entries.clone())
    }
}

fn entry(geo_id: &str, terraform_id: &str) -> RemoteEntry {
    RemoteEntry::new(geo_id, Some(terraform_id.to_string()))
}

fn resource(kind: &Arc<ResourceType>, id: &str, geo_id: &str) -> Arc<Resource> {
    Arc::new(
        Resource::builder(Arc::clone(kind), id)
            .attr(GEO_ID_KEY, geo_id)
            .build(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_access_fetches_once() {
    let provider = SlowInventory::new(vec![entry("a", "tid-a"), entry("b", "tid-b")]);
    let kind = Arc::new(ResourceType::new("lb").remote(provider.clone()));
    let inventory = Arc::new(RemoteInventory::new());

    let mut tasks = tokio::task::JoinSet::new();
    for (id, geo_id) in [("one", "a"), ("two", "b"), ("three", "c"), ("four", "a")] {
        let resource = resource(&kind, id, geo_id);
        let inventory = Arc::clone(&inventory);
        tasks.spawn(async move {
            let terraform_id = resource.terraform_id(&inventory).await.unwrap();
            (id, terraform_id.map(str::to_string))
        });
    }

    let mut resolved = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        resolved.push(joined.unwrap());
    }
    resolved.sort();

    assert_eq!(provider.calls(), 1);
    assert_eq!(
        resolved,
        vec![
            ("four", Some("tid-a".to_string())),
            ("one", Some("tid-a".to_string())),
            ("three", None),
            ("two", Some("tid-b".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_terraform_id_is_memoized_per_resource() {
    let provider = SlowInventory::new(vec![entry("a", "tid-a")]);
    let kind = Arc::new(ResourceType::new("lb").remote(provider.clone()));
    let lb = resource(&kind, "one", "a");

    let first = RemoteInventory::new();
    let second = RemoteInventory::new();
    assert_eq!(lb.terraform_id(&first).await.unwrap(), Some("tid-a"));
    assert_eq!(lb.terraform_id(&second).await.unwrap(), Some("tid-a"));
    assert_eq!(provider.calls(), 1);
    assert_eq!(lb.known_terraform_id(), Some("tid-a"));
}

#[tokio::test]
async fn test_remote_resource_rematches_from_cache() {
    let provider = SlowInventory::new(vec![entry("a", "tid-a")]);
    let kind = Arc::new(ResourceType::new("lb").remote(provider.clone()));
    let lb = resource(&kind, "one", "a");
    let inventory = RemoteInventory::new();

    for _ in 0..3 {
        let remote = lb.remote_resource(&inventory).await.unwrap();
        assert_eq!(remote.unwrap().terraform_id.as_deref(), Some("tid-a"));
    }
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_ambiguous_remote_aborts_state_generation() {
    let provider = SlowInventory::new(vec![entry("dup", "tid-1"), entry("dup", "tid-2")]);
    let kind = Arc::new(ResourceType::new("lb").remote(provider));

    let mut node = Node::new(NodeId::new("p", "e", "c", "svc", "api"));
    node.add_resource(
        "lb",
        Resource::builder(kind, "api").attr(GEO_ID_KEY, "dup").build(),
    );
    let generation = Generation::new(vec![node], Context::default());

    match generation.to_terraform_state(&RemoteInventory::new()).await {
        Err(GenerationError::Resource(ResourceError::AmbiguousRemote { count, .. })) => {
            assert_eq!(count, 2)
        }
        other => panic!("expected AmbiguousRemote, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_prefetch_isolates_failing_types() {
    let provider = SlowInventory::failing_for("broken", vec![entry("a", "tid-a")]);
    let healthy = Arc::new(ResourceType::new("healthy").remote(provider.clone()));
    let broken = Arc::new(ResourceType::new("broken").remote(provider.clone()));
    let local = Arc::new(ResourceType::new("local"));

    let mut node = Node::new(NodeId::new("p", "e", "c", "svc", "api"));
    node.add_resource("h1", Resource::builder(Arc::clone(&healthy), "h1").build());
    node.add_resource("h2", Resource::builder(healthy, "h2").build());
    node.add_resource("b", Resource::builder(broken, "b").build());
    node.add_resource("l", Resource::builder(local, "l").build());
    let generation = Generation::new(vec![node], Context::default());

    let inventory = Arc::new(RemoteInventory::new());
    let outcomes = generation.prefetch(Arc::clone(&inventory)).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes["healthy"].as_ref().ok(), Some(&1));
    assert!(matches!(outcomes["broken"], Err(ProviderError::Fetch(_))));
    assert_eq!(provider.calls(), 2);

    assert!(inventory.cached("healthy").is_some());
    assert!(inventory.cached("broken").is_none());
    assert_eq!(inventory.snapshot().len(), 1);
}

#[tokio::test]
async fn test_snapshot_seeded_inventory_skips_fetch() {
    let provider = SlowInventory::new(Vec::new());
    let kind = Arc::new(ResourceType::new("lb").remote(provider.clone()));
    let lb = resource(&kind, "one", "seeded");

    let mut snapshot = geoengineer::cache::InventorySnapshot::new();
    snapshot.insert("lb".to_string(), vec![entry("seeded", "tid-seeded")]);
    let inventory = RemoteInventory::from_snapshot(snapshot);

    assert_eq!(lb.terraform_id(&inventory).await.unwrap(), Some("tid-seeded"));
    assert_eq!(provider.calls(), 0);
}
