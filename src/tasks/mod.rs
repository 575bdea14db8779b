//! Background Tasks Module
//!
//! # Tasks
//! - Idle cleanup: drops entries of this member's partitions whose idle
//!   timeout passed without access

mod cleanup;

pub use cleanup::spawn_cleanup_task;
