//! Keyed cache contract shared by the single-process and cluster backends.

use async_trait::async_trait;

use crate::cache::NamespaceSpec;
use crate::error::Result;

/// A cluster-wide mapping from `(namespace, key)` to bytes.
///
/// Implementations guarantee read-your-writes on the home member and a single
/// authoritative copy per key, which makes every operation linearizable per key.
/// No locking is exposed to callers.
#[async_trait]
pub trait KeyedCache: Send + Sync {
    /// Store a value, replacing any previous one.
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()>;

    /// Fetch a live value.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Fetch a live value without refreshing its idle clock.
    async fn peek(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove a value, returning it if it was live.
    async fn remove(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Check for a live value without refreshing its idle clock.
    async fn contains_key(&self, namespace: &str, key: &str) -> Result<bool>;

    /// Residency and expiry policy of a namespace.
    fn namespace(&self, name: &str) -> Option<NamespaceSpec>;
}
