//! Notify Module
//!
//! Debounced change notifications: a per-topic debouncer, a change feed that
//! drives it, and the subscribers it delivers to.

mod debouncer;
mod feed;
mod subscribers;

pub use debouncer::Debouncer;
pub use feed::{change_channel, spawn_notification_loop, ChangeEvent, ChangeFeed, ChangePublisher};
pub use subscribers::{Notification, Subscribers};
