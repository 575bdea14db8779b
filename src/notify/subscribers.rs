//! Subscriber registry for debounced notifications.
//!
//! Each connected principal owns one unbounded channel and a set of watched
//! topics. How the receiving end reaches the principal is up to the caller.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

/// Pushed to every principal watching `topic` when its debounce fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub topic: String,
    pub fired_at: DateTime<Utc>,
}

struct Connection {
    tx: UnboundedSender<Notification>,
    topics: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct Subscribers {
    connections: Arc<Mutex<HashMap<String, Connection>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a channel for `principal`, dropping any earlier one and its topics.
    pub fn connect(&self, principal: impl Into<String>) -> UnboundedReceiver<Notification> {
        let principal = principal.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let replaced = self
            .lock()
            .insert(
                principal.clone(),
                Connection {
                    tx,
                    topics: HashSet::new(),
                },
            )
            .is_some();
        debug!(principal = %principal, replaced, "Subscriber connected");
        rx
    }

    /// Returns false when `principal` is not connected.
    pub fn watch(&self, principal: &str, topic: impl Into<String>) -> bool {
        match self.lock().get_mut(principal) {
            Some(connection) => {
                connection.topics.insert(topic.into());
                true
            }
            None => false,
        }
    }

    pub fn unwatch(&self, principal: &str, topic: &str) -> bool {
        self.lock()
            .get_mut(principal)
            .map(|c| c.topics.remove(topic))
            .unwrap_or(false)
    }

    pub fn disconnect(&self, principal: &str) -> bool {
        let removed = self.lock().remove(principal).is_some();
        if removed {
            debug!(principal, "Subscriber disconnected");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Deliver ==
    /// Sends a notification for `topic` to every principal watching it.
    ///
    /// Principals whose receiver was dropped are removed. Returns the number
    /// of principals reached.
    pub fn deliver(&self, topic: &str) -> usize {
        let notification = Notification {
            topic: topic.to_string(),
            fired_at: Utc::now(),
        };

        let mut connections = self.lock();
        let mut delivered = 0;
        connections.retain(|principal, connection| {
            if !connection.topics.contains(topic) {
                return !connection.tx.is_closed();
            }
            match connection.tx.send(notification.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    trace!(principal = %principal, "Dropping closed subscriber");
                    false
                }
            }
        });

        debug!(topic, delivered, "Notification delivered");
        delivered
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Connection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
