//! Cluster Membership Module
//!
//! Static member list: identities and the addresses their member protocol
//! listens on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, Result};

// == Member Id ==
/// Stable identity of a cluster member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// == Member ==
/// A member and the `host:port` its member protocol is served on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub address: String,
}

// == Membership ==
/// The member list as seen by the local member.
///
/// Members are kept sorted by id so every member derives the same partition
/// layout from the same configuration.
#[derive(Debug, Clone)]
pub struct Membership {
    local: MemberId,
    members: Vec<Member>,
}

impl Membership {
    /// Builds a membership, adding the local member if the list omits it.
    pub fn new(local: MemberId, local_address: impl Into<String>, members: Vec<Member>) -> Self {
        let mut members = members;
        if !members.iter().any(|m| m.id == local) {
            members.push(Member {
                id: local.clone(),
                address: local_address.into(),
            });
        }
        members.sort_by(|a, b| a.id.cmp(&b.id));
        members.dedup_by(|a, b| a.id == b.id);
        Self { local, members }
    }

    /// A cluster made of the local member alone.
    pub fn single(local: MemberId, address: impl Into<String>) -> Self {
        Self::new(local, address, Vec::new())
    }

    /// Parses a `id=host:port,id=host:port` list.
    ///
    /// # Errors
    /// `InvalidRequest` when an entry lacks `=` or has an empty id or address.
    pub fn parse(local: MemberId, local_address: impl Into<String>, raw: &str) -> Result<Self> {
        let mut members = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, address) = entry.split_once('=').ok_or_else(|| {
                ProxyError::InvalidRequest(format!("member entry '{}' is not id=host:port", entry))
            })?;
            let (id, address) = (id.trim(), address.trim());
            if id.is_empty() || address.is_empty() {
                return Err(ProxyError::InvalidRequest(format!(
                    "member entry '{}' has an empty id or address",
                    entry
                )));
            }
            members.push(Member {
                id: MemberId::new(id),
                address: address.to_string(),
            });
        }
        Ok(Self::new(local, local_address, members))
    }

    pub fn local(&self) -> &MemberId {
        &self.local
    }

    pub fn is_local(&self, id: &MemberId) -> bool {
        &self.local == id
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }

    pub fn address_of(&self, id: &MemberId) -> Option<&str> {
        self.members
            .iter()
            .find(|m| &m.id == id)
            .map(|m| m.address.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
