//! Local Store Module
//!
//! Process-scoped storage for every namespace this member holds entries for:
//! local-only namespaces, and the partitions of replicated namespaces this
//! member owns.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheEntry, CacheStats, Namespaces, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{ProxyError, Result};

/// Store handle shared between the cache, the member protocol and the cleanup task.
pub type SharedStore = Arc<RwLock<LocalStore>>;

#[derive(Debug, Default)]
struct Partition {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

// == Local Store ==
#[derive(Debug)]
pub struct LocalStore {
    namespaces: Arc<Namespaces>,
    partitions: HashMap<String, Partition>,
}

impl LocalStore {
    // == Constructor ==
    pub fn new(namespaces: Arc<Namespaces>) -> Self {
        Self {
            namespaces,
            partitions: HashMap::new(),
        }
    }

    pub fn shared(namespaces: Arc<Namespaces>) -> SharedStore {
        Arc::new(RwLock::new(Self::new(namespaces)))
    }

    // == Put ==
    /// Stores a value, replacing any previous value and restarting its idle clock.
    pub fn put(&mut self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()> {
        validate_key(key)?;

        if value.len() > MAX_VALUE_SIZE {
            return Err(ProxyError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let idle_timeout = self.namespaces.require(namespace)?.idle_timeout;
        let partition = self.partitions.entry(namespace.to_string()).or_default();
        partition
            .entries
            .insert(key.to_string(), CacheEntry::new(value, idle_timeout));
        partition.stats.set_total_entries(partition.entries.len());

        Ok(())
    }

    // == Get ==
    /// Returns a live value and refreshes its idle clock.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        self.namespaces.require(namespace)?;

        let Some(partition) = self.partitions.get_mut(namespace) else {
            return Ok(None);
        };

        match partition.entries.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                partition.entries.remove(key);
                partition.stats.record_expirations(1);
                partition.stats.record_miss();
                partition.stats.set_total_entries(partition.entries.len());
                Ok(None)
            }
            Some(entry) => {
                entry.touch();
                partition.stats.record_hit();
                Ok(Some(entry.value.clone()))
            }
            None => {
                partition.stats.record_miss();
                Ok(None)
            }
        }
    }

    // == Peek ==
    /// Returns a live value without refreshing its idle clock.
    pub fn peek(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        self.namespaces.require(namespace)?;

        Ok(self
            .partitions
            .get(namespace)
            .and_then(|p| p.entries.get(key))
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone()))
    }

    // == Remove ==
    /// Removes an entry, returning its value if it was live.
    pub fn remove(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        self.namespaces.require(namespace)?;

        let Some(partition) = self.partitions.get_mut(namespace) else {
            return Ok(None);
        };

        let removed = partition.entries.remove(key);
        partition.stats.set_total_entries(partition.entries.len());

        Ok(removed.filter(|e| !e.is_expired()).map(|e| e.value))
    }

    // == Contains Key ==
    /// Checks for a live entry without refreshing its idle clock.
    pub fn contains_key(&self, namespace: &str, key: &str) -> Result<bool> {
        validate_key(key)?;
        self.namespaces.require(namespace)?;

        Ok(self
            .partitions
            .get(namespace)
            .and_then(|p| p.entries.get(key))
            .is_some_and(|e| !e.is_expired()))
    }

    // == Cleanup Expired ==
    /// Removes all idle-expired entries across namespaces.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let mut removed = 0;

        for partition in self.partitions.values_mut() {
            let before = partition.entries.len();
            partition.entries.retain(|_, entry| !entry.is_expired());
            let count = before - partition.entries.len();

            partition.stats.record_expirations(count);
            partition.stats.set_total_entries(partition.entries.len());
            removed += count;
        }

        removed
    }

    // == Stats ==
    /// Statistics per namespace, sorted by namespace name.
    pub fn stats(&self) -> Vec<(String, CacheStats)> {
        let mut stats: Vec<(String, CacheStats)> = self
            .partitions
            .iter()
            .map(|(name, p)| (name.clone(), p.stats.clone()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    /// Number of entries held for a namespace, expired or not.
    pub fn len(&self, namespace: &str) -> usize {
        self.partitions
            .get(namespace)
            .map_or(0, |p| p.entries.len())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ProxyError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(ProxyError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
