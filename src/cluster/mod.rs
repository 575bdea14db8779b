//! Cluster Module
//!
//! Member identities, the static member list and the partition policy that
//! picks the home member for a routing key.

mod member;
mod partition;

pub use member::{Member, MemberId, Membership};
pub use partition::{jump_hash, key_hash, PartitionPolicy};
