//! Per-key execution locks held by the home member.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Serializes operations on the same `(namespace, key)`.
///
/// Slots are created on demand and dropped once no task holds or waits on them.
#[derive(Clone, Default)]
pub struct KeyLocks {
    slots: Arc<Mutex<HashMap<(String, String), Slot>>>,
}

/// Held for the duration of one operation; releasing it prunes idle slots.
pub struct KeyGuard {
    locks: KeyLocks,
    slot_key: (String, String),
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other operation holds `(namespace, key)`.
    ///
    /// Waiters are granted the lock in arrival order.
    pub async fn acquire(&self, namespace: &str, key: &str) -> KeyGuard {
        let slot_key = (namespace.to_string(), key.to_string());
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(slot_key.clone()).or_default().clone()
        };

        let guard = slot.lock_owned().await;
        KeyGuard {
            locks: self.clone(),
            slot_key,
            guard: Some(guard),
        }
    }

    /// Number of keys with a live slot.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only sees the map and waiters
        self.guard.take();

        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(&self.slot_key) {
            if Arc::strong_count(slot) == 1 {
                slots.remove(&self.slot_key);
            }
        }
    }
}
