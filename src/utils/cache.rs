//! Highlight Set - short-lived "new" markers for feed entries
//!
//! Thread-safe TTL set keyed by transaction hash. A hash marked here counts
//! as highlighted until its TTL elapses; nothing else depends on it, so a
//! consumer that never reads it loses nothing.
//!
//! Features:
//! - TTL-based expiration (5s default)
//! - Re-marking refreshes the TTL
//! - Thread-safe with DashMap

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::utils::constants::DEFAULT_HIGHLIGHT_TTL_SECS;

/// Marker with its own creation time
#[derive(Clone, Copy, Debug)]
pub struct HighlightEntry {
    pub created_at: Instant,
    pub ttl: Duration,
}

impl HighlightEntry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    /// Time left before expiry
    pub fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.created_at.elapsed())
    }
}

/// Set of recently admitted hashes
#[derive(Clone)]
pub struct HighlightSet {
    store: Arc<DashMap<String, HighlightEntry>>,
    ttl: Duration,
    marked: Arc<AtomicU64>,
}

impl Default for HighlightSet {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_HIGHLIGHT_TTL_SECS))
    }
}

impl HighlightSet {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl,
            marked: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Mark hashes as new; already-marked hashes get a fresh TTL
    pub fn mark<I, S>(&self, hashes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut count = 0u64;
        for hash in hashes {
            self.store.insert(hash.into(), HighlightEntry::new(self.ttl));
            count += 1;
        }
        if count > 0 {
            self.marked.fetch_add(count, Ordering::Relaxed);
            debug!("✨ HIGHLIGHT: {} hashes (TTL: {:?})", count, self.ttl);
        }
    }

    /// Whether `hash` is still highlighted. Expired entries are evicted lazily.
    pub fn is_highlighted(&self, hash: &str) -> bool {
        let expired = match self.store.get(hash) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };
        if expired {
            self.store.remove(hash);
        }
        !expired
    }

    /// Hashes currently highlighted, in no particular order
    pub fn active(&self) -> Vec<String> {
        self.store
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Drop every expired marker
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.store.len());
        if removed > 0 {
            debug!("🧹 HIGHLIGHT CLEANUP: {} expired markers removed", removed);
        }
        removed
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Total hashes ever marked
    pub fn total_marked(&self) -> u64 {
        self.marked.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_check() {
        let set = HighlightSet::default();
        set.mark(["0xaa", "0xbb"]);

        assert!(set.is_highlighted("0xaa"));
        assert!(set.is_highlighted("0xbb"));
        assert!(!set.is_highlighted("0xcc"));
        assert_eq!(set.total_marked(), 2);

        let mut active = set.active();
        active.sort();
        assert_eq!(active, vec!["0xaa".to_string(), "0xbb".to_string()]);
    }

    #[test]
    fn test_expiry() {
        let set = HighlightSet::new(Duration::from_millis(10));
        set.mark(vec!["0xaa".to_string()]);
        std::thread::sleep(Duration::from_millis(30));

        assert!(set.active().is_empty());
        assert!(!set.is_highlighted("0xaa"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let set = HighlightSet::new(Duration::from_millis(10));
        set.mark(["0xaa", "0xbb"]);
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(set.cleanup_expired(), 2);
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_empty_mark_is_noop() {
        let set = HighlightSet::default();
        set.mark(Vec::<String>::new());
        assert_eq!(set.total_marked(), 0);
    }
}
