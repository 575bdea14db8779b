//! Single-process `KeyedCache` for tests and the non-clustered deployment.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{KeyedCache, LocalStore, NamespaceSpec, Namespaces, SharedStore};
use crate::error::Result;

/// Every namespace, replicated or not, lives in the local store.
#[derive(Clone)]
pub struct MemoryCache {
    namespaces: Arc<Namespaces>,
    store: SharedStore,
}

impl MemoryCache {
    pub fn new(namespaces: Arc<Namespaces>, store: SharedStore) -> Self {
        Self { namespaces, store }
    }

    /// Builds a cache over a fresh store.
    pub fn with_namespaces(namespaces: Namespaces) -> Self {
        let namespaces = Arc::new(namespaces);
        let store = LocalStore::shared(namespaces.clone());
        Self::new(namespaces, store)
    }
}

#[async_trait]
impl KeyedCache for MemoryCache {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()> {
        self.store.write().await.put(namespace, key, value)
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        // Write lock: a read refreshes the idle clock
        self.store.write().await.get(namespace, key)
    }

    async fn peek(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.store.read().await.peek(namespace, key)
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.store.write().await.remove(namespace, key)
    }

    async fn contains_key(&self, namespace: &str, key: &str) -> Result<bool> {
        self.store.read().await.contains_key(namespace, key)
    }

    fn namespace(&self, name: &str) -> Option<NamespaceSpec> {
        self.namespaces.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> MemoryCache {
        let namespaces = Namespaces::new()
            .with(NamespaceSpec::replicated("export-locations"))
            .with(NamespaceSpec::local_only("export-bytes", "export-locations"));
        MemoryCache::with_namespaces(namespaces)
    }

    #[tokio::test]
    async fn test_put_get_remove_contains() {
        let cache = cache();

        assert!(!cache.contains_key("export-bytes", "EXP-1").await.unwrap());
        cache.put("export-bytes", "EXP-1", vec![1, 2, 3]).await.unwrap();

        assert!(cache.contains_key("export-bytes", "EXP-1").await.unwrap());
        assert_eq!(cache.get("export-bytes", "EXP-1").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(cache.remove("export-bytes", "EXP-1").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("export-bytes", "EXP-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_namespace_lookup() {
        let cache = cache();
        assert!(cache.namespace("export-bytes").unwrap().is_local_only());
        assert!(cache.namespace("unknown").is_none());
    }
}
