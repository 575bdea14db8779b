//! Integration Tests for an in-process cluster
//!
//! Three members share one `InProcessNetwork`; every call still crosses a
//! JSON boundary, so these exercise the same paths as the HTTP cluster.

use std::sync::Arc;

use cluster_proxy::cache::{KeyedCache, NamespaceSpec, Namespaces};
use cluster_proxy::cluster::{MemberId, PartitionPolicy};
use cluster_proxy::config::{CacheBackend, Config};
use cluster_proxy::dispatch::handler_fn;
use cluster_proxy::transport::InProcessNetwork;
use cluster_proxy::{Node, ProxyError};
use serde_json::{json, Value};

// == Helper Functions ==

const MEMBERS: &str = "a=in-process,b=in-process,c=in-process";

fn config(member: &str) -> Config {
    Config {
        member_id: member.to_string(),
        cluster_members: MEMBERS.to_string(),
        cache_backend: CacheBackend::Cluster,
        ..Config::default()
    }
}

fn namespaces() -> Namespaces {
    Namespaces::new().with(NamespaceSpec::replicated("accounts"))
}

/// Registers `deposit` on a member: adds `args` to the balance under `key`
/// and reports which member ran it.
async fn register_deposit(node: &Node) {
    let cache: Arc<dyn KeyedCache> = node.cache().clone();
    let member = node.member().to_string();
    node.dispatcher()
        .registry()
        .register(
            "accounts",
            "deposit",
            handler_fn(move |key, args| {
                let cache = cache.clone();
                let member = member.clone();
                async move {
                    let amount = args
                        .as_i64()
                        .ok_or_else(|| anyhow::anyhow!("amount must be an integer"))?;
                    let balance = match cache.get("accounts", &key).await? {
                        Some(bytes) => serde_json::from_slice::<i64>(&bytes)?,
                        None => 0,
                    };
                    // Yield between read and write so unserialized calls would interleave
                    tokio::task::yield_now().await;
                    let balance = balance + amount;
                    cache
                        .put("accounts", &key, serde_json::to_vec(&balance)?)
                        .await?;
                    Ok::<_, anyhow::Error>(json!({ "balance": balance, "ran_on": member }))
                }
            }),
        )
        .await;
}

async fn cluster(network: &InProcessNetwork) -> Vec<Node> {
    let mut nodes = Vec::new();
    for id in ["a", "b", "c"] {
        let node = Node::in_process(&config(id), namespaces(), network)
            .await
            .unwrap();
        register_deposit(&node).await;
        nodes.push(node);
    }
    nodes
}

/// A key whose hash owner is `member`.
fn key_owned_by(node: &Node, member: &str) -> String {
    let policy = PartitionPolicy::new(node.membership());
    (0..)
        .map(|i| format!("acct-{}", i))
        .find(|key| policy.owner(key).as_str() == member)
        .unwrap()
}

// == Dispatch ==

#[tokio::test]
async fn test_invoke_is_location_transparent() {
    let network = InProcessNetwork::new();
    let nodes = cluster(&network).await;
    let key = key_owned_by(&nodes[0], "b");

    for node in &nodes {
        let result = node
            .dispatcher()
            .invoke("accounts", &key, "deposit", json!(10))
            .await
            .unwrap();
        assert_eq!(result["ran_on"], "b");
    }

    let balance = nodes[2].cache().get("accounts", &key).await.unwrap().unwrap();
    assert_eq!(serde_json::from_slice::<i64>(&balance).unwrap(), 30);
}

#[tokio::test]
async fn test_concurrent_invokes_on_one_key_are_serialized() {
    let network = InProcessNetwork::new();
    let nodes = Arc::new(cluster(&network).await);
    let key = key_owned_by(&nodes[0], "c");

    let mut tasks = Vec::new();
    for i in 0..30 {
        let nodes = nodes.clone();
        let key = key.clone();
        tasks.push(tokio::spawn(async move {
            nodes[i % 3]
                .dispatcher()
                .invoke("accounts", &key, "deposit", json!(1))
                .await
                .unwrap()
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let balance = nodes[0].cache().get("accounts", &key).await.unwrap().unwrap();
    assert_eq!(serde_json::from_slice::<i64>(&balance).unwrap(), 30);
}

#[tokio::test]
async fn test_remote_handler_failure_is_operation_error() {
    let network = InProcessNetwork::new();
    let nodes = cluster(&network).await;
    let key = key_owned_by(&nodes[0], "a");

    let err = nodes[1]
        .dispatcher()
        .invoke("accounts", &key, "deposit", json!("ten"))
        .await
        .unwrap_err();

    match err {
        ProxyError::Operation { operation, source } => {
            assert_eq!(operation, "deposit");
            assert!(source.to_string().contains("amount must be an integer"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_home_is_remote_execution() {
    let network = InProcessNetwork::new();
    let nodes = cluster(&network).await;
    let key = key_owned_by(&nodes[0], "c");

    network.set_unreachable(&MemberId::new("c"), true);
    let err = nodes[0]
        .dispatcher()
        .invoke("accounts", &key, "deposit", json!(5))
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyError::RemoteExecution { ref member, .. } if member == "c"));
    assert!(!err.is_retry_safe());

    network.set_unreachable(&MemberId::new("c"), false);
    let result = nodes[0]
        .dispatcher()
        .invoke("accounts", &key, "deposit", json!(5))
        .await
        .unwrap();
    assert_eq!(result["balance"], 5);
}

#[tokio::test]
async fn test_unknown_namespace_is_invalid_request() {
    let network = InProcessNetwork::new();
    let nodes = cluster(&network).await;

    let err = nodes[0]
        .dispatcher()
        .invoke("nowhere", "k", "deposit", Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::InvalidRequest(_)));
}

// == Artifacts ==

#[tokio::test]
async fn test_export_bundle_retrieved_from_another_member() {
    let network = InProcessNetwork::new();
    let nodes = cluster(&network).await;
    let (a, b, c) = (&nodes[0], &nodes[1], &nodes[2]);

    assert!(!c.artifacts().exists("EXP-42").await.unwrap());

    let handle = a
        .artifacts()
        .create("EXP-42", "report.zip", || async { Ok(vec![0x5A; 1024]) })
        .await
        .unwrap();
    assert_eq!(handle.owner.as_str(), "a");

    // Visible everywhere, payload only on the creator
    for node in &nodes {
        assert!(node.artifacts().exists("EXP-42").await.unwrap());
        assert_eq!(
            node.artifacts().display_name("EXP-42").await.unwrap().as_deref(),
            Some("report.zip")
        );
    }
    assert_eq!(b.store().read().await.len("export-bytes"), 0);
    assert_eq!(a.store().read().await.len("export-bytes"), 1);

    let bytes = c.artifacts().retrieve("EXP-42").await.unwrap().unwrap();
    assert_eq!(bytes.len(), 1024);
    assert!(bytes.iter().all(|b| *b == 0x5A));

    assert_eq!(b.artifacts().retrieve("EXP-42").await.unwrap(), None);
    for node in &nodes {
        assert!(!node.artifacts().exists("EXP-42").await.unwrap());
    }
    assert_eq!(a.store().read().await.len("export-bytes"), 0);
}

#[tokio::test]
async fn test_generator_failure_is_visible_nowhere() {
    let network = InProcessNetwork::new();
    let nodes = cluster(&network).await;

    let err = nodes[1]
        .artifacts()
        .create("EXP-13", "broken.zip", || async {
            Err(anyhow::anyhow!("disk full"))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyError::Generation { .. }));
    for node in &nodes {
        assert!(!node.artifacts().exists("EXP-13").await.unwrap());
        assert_eq!(node.artifacts().retrieve("EXP-13").await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_concurrent_creates_on_two_members_admit_one() {
    let network = InProcessNetwork::new();
    let nodes = cluster(&network).await;
    let (a, b) = (&nodes[0], &nodes[1]);

    let (from_a, from_b) = tokio::join!(
        a.artifacts().create("EXP-1", "a.zip", || async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(b"from-a".to_vec())
        }),
        b.artifacts().create("EXP-1", "b.zip", || async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(b"from-b".to_vec())
        }),
    );

    let (winner, name) = match (from_a, from_b) {
        (Ok(_), Err(ProxyError::InvalidRequest(_))) => (b"from-a".to_vec(), "a.zip"),
        (Err(ProxyError::InvalidRequest(_)), Ok(_)) => (b"from-b".to_vec(), "b.zip"),
        other => panic!("expected exactly one create to succeed: {other:?}"),
    };

    let mut payloads = 0;
    for node in &nodes {
        payloads += node.store().read().await.len("export-bytes");
    }
    assert_eq!(payloads, 1);
    assert_eq!(
        nodes[2].artifacts().display_name("EXP-1").await.unwrap().as_deref(),
        Some(name)
    );

    assert_eq!(nodes[2].artifacts().retrieve("EXP-1").await.unwrap(), Some(winner));
    for node in &nodes {
        assert_eq!(node.store().read().await.len("export-bytes"), 0);
    }
}

#[tokio::test]
async fn test_retrieve_with_owner_down_fails_then_succeeds() {
    let network = InProcessNetwork::new();
    let nodes = cluster(&network).await;

    nodes[2]
        .artifacts()
        .create("EXP-77", "late.zip", || async { Ok(b"late".to_vec()) })
        .await
        .unwrap();

    // The payload owner is down; retrieval fails without consuming anything
    network.set_unreachable(&MemberId::new("c"), true);
    let err = nodes[0].artifacts().retrieve("EXP-77").await.unwrap_err();
    assert!(matches!(err, ProxyError::RemoteExecution { .. }));

    network.set_unreachable(&MemberId::new("c"), false);
    assert_eq!(
        nodes[0].artifacts().retrieve("EXP-77").await.unwrap(),
        Some(b"late".to_vec())
    );
}
