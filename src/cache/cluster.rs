//! Networked `KeyedCache`.
//!
//! Local-only namespaces stay in this member's store. Replicated namespaces
//! keep their single authoritative copy on the key's hash owner; other
//! members reach it through the transport.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::cache::{KeyedCache, NamespaceSpec, Namespaces, Residency, SharedStore};
use crate::cluster::{MemberId, Membership, PartitionPolicy};
use crate::error::Result;
use crate::transport::Transport;

enum Route {
    Local,
    Remote(MemberId),
}

#[derive(Clone)]
pub struct ClusterCache {
    namespaces: Arc<Namespaces>,
    membership: Arc<Membership>,
    partition: PartitionPolicy,
    store: SharedStore,
    transport: Arc<dyn Transport>,
}

impl ClusterCache {
    pub fn new(
        namespaces: Arc<Namespaces>,
        membership: Arc<Membership>,
        store: SharedStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            partition: PartitionPolicy::new(&membership),
            namespaces,
            membership,
            store,
            transport,
        }
    }

    fn route(&self, namespace: &str, key: &str) -> Result<Route> {
        let spec = self.namespaces.require(namespace)?;
        let route = match spec.residency {
            Residency::LocalOnly { .. } => Route::Local,
            Residency::Replicated => {
                let owner = self.partition.owner(key);
                if self.membership.is_local(owner) {
                    Route::Local
                } else {
                    Route::Remote(owner.clone())
                }
            }
        };
        Ok(route)
    }
}

#[async_trait]
impl KeyedCache for ClusterCache {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()> {
        match self.route(namespace, key)? {
            Route::Local => self.store.write().await.put(namespace, key, value),
            Route::Remote(owner) => {
                trace!(namespace, key, owner = %owner, "Remote cache put");
                self.transport.cache_put(&owner, namespace, key, value).await
            }
        }
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        match self.route(namespace, key)? {
            Route::Local => self.store.write().await.get(namespace, key),
            Route::Remote(owner) => {
                trace!(namespace, key, owner = %owner, "Remote cache get");
                self.transport.cache_get(&owner, namespace, key).await
            }
        }
    }

    async fn peek(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        match self.route(namespace, key)? {
            Route::Local => self.store.read().await.peek(namespace, key),
            Route::Remote(owner) => self.transport.cache_peek(&owner, namespace, key).await,
        }
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        match self.route(namespace, key)? {
            Route::Local => self.store.write().await.remove(namespace, key),
            Route::Remote(owner) => self.transport.cache_remove(&owner, namespace, key).await,
        }
    }

    async fn contains_key(&self, namespace: &str, key: &str) -> Result<bool> {
        match self.route(namespace, key)? {
            Route::Local => self.store.read().await.contains_key(namespace, key),
            Route::Remote(owner) => self.transport.cache_contains(&owner, namespace, key).await,
        }
    }

    fn namespace(&self, name: &str) -> Option<NamespaceSpec> {
        self.namespaces.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalStore;
    use crate::dispatch::{Dispatcher, OperationRegistry};
    use crate::error::ProxyError;
    use crate::transport::InProcessNetwork;

    struct Member {
        cache: ClusterCache,
        store: SharedStore,
        _dispatcher: Arc<Dispatcher>,
    }

    fn namespaces() -> Arc<Namespaces> {
        Arc::new(
            Namespaces::new()
                .with(NamespaceSpec::replicated("locations"))
                .with(NamespaceSpec::local_only("blobs", "locations")),
        )
    }

    fn cluster(ids: &[&str]) -> (InProcessNetwork, Vec<Member>) {
        let network = InProcessNetwork::new();
        let raw = ids
            .iter()
            .map(|id| format!("{}=in-process", id))
            .collect::<Vec<_>>()
            .join(",");

        let members = ids
            .iter()
            .map(|id| {
                let membership =
                    Arc::new(Membership::parse(MemberId::new(*id), "in-process", &raw).unwrap());
                let namespaces = namespaces();
                let store = LocalStore::shared(namespaces.clone());
                let transport: Arc<dyn Transport> = Arc::new(network.clone());
                let cache = ClusterCache::new(
                    namespaces,
                    membership.clone(),
                    store.clone(),
                    transport.clone(),
                );
                let dispatcher = Arc::new(Dispatcher::new(
                    membership,
                    Arc::new(cache.clone()),
                    OperationRegistry::new(),
                    transport,
                ));
                network.attach(MemberId::new(*id), store.clone(), &dispatcher);
                Member {
                    cache,
                    store,
                    _dispatcher: dispatcher,
                }
            })
            .collect();

        (network, members)
    }

    #[tokio::test]
    async fn test_replicated_value_visible_from_every_member() {
        let (_network, members) = cluster(&["a", "b", "c"]);

        members[0]
            .cache
            .put("locations", "EXP-1", b"record".to_vec())
            .await
            .unwrap();

        for member in &members {
            assert_eq!(
                member.cache.get("locations", "EXP-1").await.unwrap(),
                Some(b"record".to_vec())
            );
            assert!(member.cache.contains_key("locations", "EXP-1").await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_replicated_value_has_single_authoritative_copy() {
        let (_network, members) = cluster(&["a", "b", "c"]);

        for i in 0..30 {
            let key = format!("key-{}", i);
            members[i % 3]
                .cache
                .put("locations", &key, b"v".to_vec())
                .await
                .unwrap();
        }

        let mut total = 0;
        for member in &members {
            total += member.store.read().await.len("locations");
        }
        assert_eq!(total, 30);
    }

    #[tokio::test]
    async fn test_local_only_value_stays_on_writer() {
        let (_network, members) = cluster(&["a", "b"]);

        members[0]
            .cache
            .put("blobs", "EXP-1", vec![7; 16])
            .await
            .unwrap();

        assert!(members[0].cache.contains_key("blobs", "EXP-1").await.unwrap());
        assert!(!members[1].cache.contains_key("blobs", "EXP-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_from_non_owner() {
        let (_network, members) = cluster(&["a", "b", "c"]);

        members[1]
            .cache
            .put("locations", "EXP-9", b"x".to_vec())
            .await
            .unwrap();
        assert_eq!(
            members[2].cache.remove("locations", "EXP-9").await.unwrap(),
            Some(b"x".to_vec())
        );
        assert_eq!(members[0].cache.get("locations", "EXP-9").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_owner_is_remote_error() {
        let (network, members) = cluster(&["a", "b"]);

        // Find a key whose owner is "b" and read it from "a"
        let partition = members[0].cache.partition.clone();
        let key = (0..100)
            .map(|i| format!("key-{}", i))
            .find(|k| partition.owner(k).as_str() == "b")
            .unwrap();

        network.set_unreachable(&MemberId::new("b"), true);
        let result = members[0].cache.get("locations", &key).await;
        assert!(matches!(result, Err(ProxyError::RemoteExecution { .. })));
    }
}
