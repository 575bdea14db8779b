//! Partition Policy Module
//!
//! Maps routing keys to their home member with Jump consistent hashing.
//! The cache and the dispatcher share one policy so operations execute
//! colocated with the data they manipulate.
//!
//! Reference: "A Fast, Minimal Memory, Consistent Hash Algorithm"
//! by John Lamping and Eric Veach, Google 2014

use crate::cluster::{MemberId, Membership};

// == Key Hashing ==
/// FNV-1a over the key bytes.
///
/// Members built by different compilers must agree on placement, so the
/// std `DefaultHasher` (unspecified across releases) is not used here.
pub fn key_hash(key: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    key.bytes().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

/// Jump consistent hash of a pre-hashed key into `[0, num_buckets)`.
///
/// # Panics
/// Panics if `num_buckets` is 0.
pub fn jump_hash(mut key: u64, num_buckets: u32) -> u32 {
    assert!(num_buckets > 0, "num_buckets must be > 0");

    let num_buckets = i64::from(num_buckets);
    let mut b: i64 = -1;
    let mut j: i64 = 0;

    while j < num_buckets {
        b = j;
        key = key.wrapping_mul(2862933555777941757).wrapping_add(1);
        j = ((b.wrapping_add(1) as f64) * ((1_i64 << 31) as f64 / ((key >> 33).wrapping_add(1) as f64)))
            as i64;
    }

    b as u32
}

// == Partition Policy ==
/// Resolves the home member of a routing key.
#[derive(Debug, Clone)]
pub struct PartitionPolicy {
    /// Bucket order; sorted so every member computes the same layout
    members: Vec<MemberId>,
}

impl PartitionPolicy {
    pub fn new(membership: &Membership) -> Self {
        Self {
            members: membership.ids(),
        }
    }

    /// Returns the member authoritative for `key`.
    pub fn owner(&self, key: &str) -> &MemberId {
        let bucket = jump_hash(key_hash(key), self.members.len() as u32);
        &self.members[bucket as usize]
    }
}
