//! Debounced Notifier
//!
//! Trailing-edge debounce per topic: the action of the last call fires once,
//! `delay` after that call, provided no newer call for the topic arrived.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// The single live timer of a topic.
#[derive(Debug)]
struct PendingNotification {
    /// Distinguishes this timer from ones it replaced
    generation: u64,
    scheduled_at: Instant,
    delay: Duration,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct State {
    pending: HashMap<String, PendingNotification>,
    next_generation: u64,
    closed: bool,
}

/// Clones share the same pending timers.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    state: Arc<Mutex<State>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    // == Debounce ==
    /// Schedules `action` to run once `delay` has passed without another call
    /// for `topic`.
    ///
    /// A pending timer for the topic is cancelled and replaced; its action is
    /// dropped unpolled. Calls are ordered by arrival at the internal lock, so
    /// the last caller wins. After `close` the call is ignored.
    ///
    /// Must be called from within a tokio runtime.
    pub fn debounce<F>(&self, topic: impl Into<String>, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let topic = topic.into();
        let mut state = self.lock();

        if state.closed {
            debug!(topic = %topic, "Debouncer closed, dropping event");
            return;
        }

        // Cancel and reschedule under one lock acquisition, so at most one
        // timer per topic is ever live.
        if let Some(previous) = state.pending.remove(&topic) {
            trace!(topic = %topic, generation = previous.generation, "Replacing pending notification");
            previous.handle.abort();
        }

        let generation = state.next_generation;
        state.next_generation += 1;

        let handle = tokio::spawn(fire_after(
            self.state.clone(),
            topic.clone(),
            generation,
            delay,
            action,
        ));

        state.pending.insert(
            topic,
            PendingNotification {
                generation,
                scheduled_at: Instant::now(),
                delay,
                handle,
            },
        );
    }

    // == Close ==
    /// Cancels every pending timer without firing it and refuses new ones.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;

        let cancelled = state.pending.len();
        for (_, pending) in state.pending.drain() {
            pending.handle.abort();
        }
        debug!(cancelled, "Debouncer closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn is_pending(&self, topic: &str) -> bool {
        self.lock().pending.contains_key(topic)
    }

    /// Topics with a live timer, sorted.
    pub fn pending_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.lock().pending.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// When the pending notification for `topic` is due to fire.
    pub fn deadline(&self, topic: &str) -> Option<Instant> {
        self.lock()
            .pending
            .get(topic)
            .map(|p| p.scheduled_at + p.delay)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn fire_after<F>(
    state: Arc<Mutex<State>>,
    topic: String,
    generation: u64,
    delay: Duration,
    action: F,
) where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::time::sleep(delay).await;

    {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        // A replacement may have been scheduled after this timer woke up but
        // before it took the lock; only the current generation fires.
        match state.pending.get(&topic) {
            Some(pending) if pending.generation == generation => {
                state.pending.remove(&topic);
            }
            _ => return,
        }
    }

    trace!(topic = %topic, "Firing debounced notification");
    action.await;
}
