//! Dispatch Module
//!
//! Explicit replacement for annotation-driven proxy methods: handlers are
//! registered by `(namespace, operation)` and invoked through a `Dispatcher`
//! that resolves the home member with the cache's own partition policy.

mod dispatcher;
mod locks;
mod registry;

pub use dispatcher::Dispatcher;
pub use locks::{KeyGuard, KeyLocks};
pub use registry::{handler_fn, HandlerFn, OperationHandler, OperationRegistry};
