//! Cache Module
//!
//! Cluster-wide keyed storage organized in namespaces, with a single-process
//! backend and a partitioned cluster backend behind one `KeyedCache` contract.

mod cluster;
mod entry;
mod memory;
mod namespace;
mod stats;
mod store;
mod traits;


// Re-export public types
pub use cluster::ClusterCache;
pub use entry::CacheEntry;
pub use memory::MemoryCache;
pub use namespace::{NamespaceSpec, Namespaces, OwnerRecord, Residency};
pub use stats::CacheStats;
pub use store::{LocalStore, SharedStore};
pub use traits::KeyedCache;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 64 * 1024 * 1024; // 64 MiB
