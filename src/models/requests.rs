//! Request DTOs for the member protocol
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An operation to execute on the home member of `(namespace, key)`.
///
/// Built per call and never persisted.
///
/// # Fields
/// - `namespace`: the namespace whose residency decides the home member
/// - `key`: the routing key
/// - `operation`: the name a handler was registered under
/// - `args`: JSON-encoded argument tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub namespace: String,
    pub key: String,
    pub operation: String,
    #[serde(default)]
    pub args: Value,
}

impl DispatchRequest {
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        operation: impl Into<String>,
        args: Value,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            operation: operation.into(),
            args,
        }
    }

    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.namespace.is_empty() {
            return Some("Namespace cannot be empty".to_string());
        }
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.operation.is_empty() {
            return Some("Operation cannot be empty".to_string());
        }
        None
    }
}
