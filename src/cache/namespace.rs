//! Cache Namespace Module
//!
//! Declares the independently-partitioned stores a cluster knows about and
//! where their values live.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::cluster::MemberId;
use crate::error::{ProxyError, Result};

// == Residency ==
/// Where the values of a namespace are held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Residency {
    /// One authoritative copy per key, on the key's hash owner
    Replicated,
    /// Held only by the member that wrote it; the writer is recorded
    /// in the named replicated `location` namespace
    LocalOnly { location: String },
}

// == Namespace Spec ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    pub name: String,
    pub residency: Residency,
    /// Entries untouched for this long are expired
    pub idle_timeout: Option<Duration>,
}

impl NamespaceSpec {
    pub fn replicated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            residency: Residency::Replicated,
            idle_timeout: None,
        }
    }

    pub fn local_only(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            residency: Residency::LocalOnly {
                location: location.into(),
            },
            idle_timeout: None,
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn is_local_only(&self) -> bool {
        matches!(self.residency, Residency::LocalOnly { .. })
    }
}

// == Namespace Table ==
/// The namespaces every member of a cluster is configured with.
#[derive(Debug, Clone, Default)]
pub struct Namespaces {
    specs: HashMap<String, NamespaceSpec>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, spec: NamespaceSpec) -> Self {
        self.specs.insert(spec.name.clone(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&NamespaceSpec> {
        self.specs.get(name)
    }

    /// Looks up a namespace, failing for names nobody declared.
    pub fn require(&self, name: &str) -> Result<&NamespaceSpec> {
        self.get(name)
            .ok_or_else(|| ProxyError::InvalidRequest(format!("unknown namespace '{}'", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Checks that every local-only namespace points at a declared replicated one.
    pub fn validate(&self) -> Result<()> {
        for spec in self.specs.values() {
            if let Residency::LocalOnly { location } = &spec.residency {
                match self.get(location) {
                    Some(target) if target.residency == Residency::Replicated => {}
                    _ => {
                        return Err(ProxyError::InvalidRequest(format!(
                            "namespace '{}' tracks locations in '{}', which is not a replicated namespace",
                            spec.name, location
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

// == Location Record ==
/// The part of a location-namespace value the dispatcher reads.
///
/// Values stored in a location namespace are JSON objects carrying at least
/// an `owner` field; other fields are ignored here.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerRecord {
    pub owner: MemberId,
}
