//! Cache Entry Type
//!
//! This module provides the `CacheEntry<K, V>` record stored by the TTL-aware
//! LRU cache. Besides the key and value, every entry carries the timestamps
//! needed for recency bookkeeping and time-based expiration.
//!
//! # Timestamps
//!
//! | Field | Set on | Used for |
//! |-------|--------|----------|
//! | `inserted_at` | `put` (insert or replace) | age reporting |
//! | `last_accessed` | `put`, every hit | recency, idle time |
//! | `expires_at` | `put`, only when a TTL is configured | lazy expiration |
//!
//! All timestamps come from the owning cache's [`Clock`](crate::clock::Clock),
//! so tests can drive expiration deterministically with a
//! [`ManualClock`](crate::clock::ManualClock).
//!
//! # Examples
//!
//! ```
//! use adaptive_cache::entry::CacheEntry;
//! use std::time::{Duration, Instant};
//!
//! let now = Instant::now();
//! let entry = CacheEntry::new("src/main.rs", 42, now, Some(Duration::from_secs(60)));
//! assert!(!entry.is_expired(now));
//! assert!(entry.is_expired(now + Duration::from_secs(60)));
//! ```

use core::fmt;
use std::time::{Duration, Instant};

/// A cached key/value pair with insertion, access and expiry timestamps.
///
/// Owned exclusively by the cache; callers only ever see clones of the value
/// or a shared reference while the cache lock is held.
pub struct CacheEntry<K, V> {
    /// The cached key
    pub key: K,

    /// The cached value
    pub value: V,

    /// When the current value was written.
    inserted_at: Instant,

    /// When the entry was last read or written.
    last_accessed: Instant,

    /// Deadline after which the entry counts as absent. `None` without a TTL.
    expires_at: Option<Instant>,
}

impl<K, V> CacheEntry<K, V> {
    /// Creates a new entry written at `now`.
    ///
    /// When `ttl` is `Some`, the entry expires at `now + ttl`. A TTL so large
    /// that the deadline overflows `Instant` is treated as "never expires".
    #[inline]
    pub fn new(key: K, value: V, now: Instant, ttl: Option<Duration>) -> Self {
        Self {
            key,
            value,
            inserted_at: now,
            last_accessed: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    /// Replaces the value, resetting both the recency and expiration clocks.
    ///
    /// Returns the previous value.
    #[inline]
    pub fn replace(&mut self, value: V, now: Instant, ttl: Option<Duration>) -> V {
        self.inserted_at = now;
        self.last_accessed = now;
        self.expires_at = ttl.and_then(|ttl| now.checked_add(ttl));
        core::mem::replace(&mut self.value, value)
    }

    /// Marks the entry as accessed at `now`.
    #[inline]
    pub fn touch(&mut self, now: Instant) {
        self.last_accessed = now;
    }

    /// Returns `true` once `now` has reached the expiry deadline.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }

    /// When the current value was written.
    #[inline]
    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    /// When the entry was last read or written.
    #[inline]
    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// The expiry deadline, if a TTL applies.
    #[inline]
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Time elapsed since the value was written.
    #[inline]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }

    /// Time elapsed since the last access.
    #[inline]
    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed)
    }
}

impl<K: Clone, V: Clone> Clone for CacheEntry<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            inserted_at: self.inserted_at,
            last_accessed: self.last_accessed,
            expires_at: self.expires_at,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CacheEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("inserted_at", &self.inserted_at)
            .field("last_accessed", &self.last_accessed)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_without_ttl_never_expires() {
        let now = Instant::now();
        let entry = CacheEntry::new("key", 1, now, None);
        assert_eq!(entry.expires_at(), None);
        assert!(!entry.is_expired(now + Duration::from_secs(365 * 24 * 3600)));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Instant::now();
        let ttl = Duration::from_millis(500);
        let entry = CacheEntry::new("key", 1, now, Some(ttl));
        assert!(!entry.is_expired(now + Duration::from_millis(499)));
        assert!(entry.is_expired(now + ttl));
    }

    #[test]
    fn test_replace_resets_clocks() {
        let start = Instant::now();
        let ttl = Some(Duration::from_secs(10));
        let mut entry = CacheEntry::new("key", 1, start, ttl);

        let later = start + Duration::from_secs(8);
        let old = entry.replace(2, later, ttl);
        assert_eq!(old, 1);
        assert_eq!(entry.value, 2);
        assert_eq!(entry.inserted_at(), later);
        assert!(!entry.is_expired(start + Duration::from_secs(12)));
    }

    #[test]
    fn test_touch_and_idle() {
        let start = Instant::now();
        let mut entry = CacheEntry::new("key", 1, start, None);
        entry.touch(start + Duration::from_secs(3));
        assert_eq!(entry.idle(start + Duration::from_secs(5)), Duration::from_secs(2));
        assert_eq!(entry.age(start + Duration::from_secs(5)), Duration::from_secs(5));
    }
}
