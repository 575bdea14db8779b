//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with idle-expiry support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with value and access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored bytes
    pub value: Vec<u8>,
    /// When the entry was written
    pub created_at: Instant,
    /// Last read or write
    pub last_access: Instant,
    /// Expire after this long without access, None = never
    pub idle_timeout: Option<Duration>,
}

impl CacheEntry {
    // == Constructor ==
    pub fn new(value: Vec<u8>, idle_timeout: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_access: now,
            idle_timeout,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has sat idle for its full timeout.
    ///
    /// Boundary condition: an entry is expired once the elapsed idle time is
    /// greater than or equal to the timeout.
    pub fn is_expired(&self) -> bool {
        match self.idle_timeout {
            Some(timeout) => self.last_access.elapsed() >= timeout,
            None => false,
        }
    }

    // == Touch ==
    /// Records an access, restarting the idle clock.
    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Remaining idle time before expiry, or None if the entry never expires.
    pub fn idle_remaining(&self) -> Option<Duration> {
        self.idle_timeout
            .map(|timeout| timeout.saturating_sub(self.last_access.elapsed()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_without_timeout_never_expires() {
        let entry = CacheEntry::new(b"value".to_vec(), None);

        assert_eq!(entry.value, b"value");
        assert!(!entry.is_expired());
        assert!(entry.idle_remaining().is_none());
    }

    #[test]
    fn test_entry_expires_after_idle_period() {
        let entry = CacheEntry::new(b"value".to_vec(), Some(Duration::from_millis(50)));
        assert!(!entry.is_expired());

        sleep(Duration::from_millis(80));

        assert!(entry.is_expired());
        assert_eq!(entry.idle_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_touch_restarts_idle_clock() {
        let mut entry = CacheEntry::new(b"value".to_vec(), Some(Duration::from_millis(100)));

        sleep(Duration::from_millis(60));
        entry.touch();
        sleep(Duration::from_millis(60));

        assert!(!entry.is_expired(), "touched entry should still be live");
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(b"v".to_vec(), Some(Duration::ZERO));
        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }
}
