//! Change feed
//!
//! Producers publish topic changes on a bounded channel; a single loop
//! consumes them and debounces one delivery per topic.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::notify::{Debouncer, Subscribers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub topic: String,
}

#[derive(Debug, Clone)]
pub struct ChangePublisher {
    tx: mpsc::Sender<ChangeEvent>,
}

impl ChangePublisher {
    /// Waits for room on the channel. Returns false once the loop has stopped.
    pub async fn publish(&self, topic: impl Into<String>) -> bool {
        let event = ChangeEvent {
            topic: topic.into(),
        };
        self.tx.send(event).await.is_ok()
    }
}

#[derive(Debug)]
pub struct ChangeFeed {
    rx: mpsc::Receiver<ChangeEvent>,
}

impl ChangeFeed {
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

pub fn change_channel(capacity: usize) -> (ChangePublisher, ChangeFeed) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChangePublisher { tx }, ChangeFeed { rx })
}

// == Notification Loop ==
/// Debounces every incoming change into a delivery to `subscribers`.
///
/// The loop ends when every publisher is dropped. Pending deliveries still
/// fire afterwards unless the debouncer is closed.
pub fn spawn_notification_loop(
    mut feed: ChangeFeed,
    debouncer: Debouncer,
    delay: Duration,
    subscribers: Subscribers,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(delay_ms = delay.as_millis() as u64, "Notification loop started");

        while let Some(event) = feed.next().await {
            debug!(topic = %event.topic, "Change received");
            let subscribers = subscribers.clone();
            let topic = event.topic.clone();
            debouncer.debounce(event.topic, delay, async move {
                subscribers.deliver(&topic);
            });
        }

        info!("Notification loop stopped");
    })
}
