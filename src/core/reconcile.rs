//! Reconciliation Engine
//!
//! Maintains the bounded, newest-first transaction window:
//! - dedupe by hash
//! - one record per 60s bucket after every incremental merge (newest wins)
//! - truncate to capacity
//!
//! The initial `seed` deliberately skips bucket reduction, so a freshly
//! loaded window can hold several trades from the same minute until the first
//! merge collapses them.

use std::collections::HashSet;

use crate::models::types::NormalizedTransaction;
use crate::utils::constants::{BUCKET_WIDTH_MS, DEFAULT_WINDOW_CAPACITY};

/// Minute bucket of a timestamp; negative timestamps fall into bucket 0
pub fn bucket_of(timestamp_ms: i64) -> i64 {
    if timestamp_ms <= 0 {
        0
    } else {
        timestamp_ms / BUCKET_WIDTH_MS
    }
}

/// What one merge changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Admitted hashes still present after bucket reduction and truncation
    pub new_hashes: Vec<String>,
}

impl MergeOutcome {
    pub fn is_empty(&self) -> bool {
        self.new_hashes.is_empty()
    }
}

/// Newest-first window plus its hash index
#[derive(Debug, Clone)]
pub struct TransactionWindow {
    entries: Vec<NormalizedTransaction>,
    index: HashSet<String>,
    capacity: usize,
    seeded: bool,
}

impl Default for TransactionWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl TransactionWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashSet::new(),
            capacity: capacity.max(1),
            seeded: false,
        }
    }

    /// Replace the window with an initial load
    pub fn seed(&mut self, records: Vec<NormalizedTransaction>) {
        let mut seen = HashSet::with_capacity(records.len());
        let mut entries: Vec<NormalizedTransaction> = records
            .into_iter()
            .filter(|tx| seen.insert(tx.hash.clone()))
            .collect();

        // sort_by is stable: equal timestamps keep upstream order
        entries.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        entries.truncate(self.capacity);

        self.entries = entries;
        self.rebuild_index();
        self.seeded = true;
    }

    /// Merge an incremental batch
    pub fn merge(&mut self, incoming: Vec<NormalizedTransaction>) -> MergeOutcome {
        let mut batch_seen = HashSet::new();
        let admitted: Vec<NormalizedTransaction> = incoming
            .into_iter()
            .filter(|tx| !self.index.contains(&tx.hash) && batch_seen.insert(tx.hash.clone()))
            .collect();

        if admitted.is_empty() {
            return MergeOutcome::default();
        }

        let admitted_hashes: Vec<String> = admitted.iter().map(|tx| tx.hash.clone()).collect();

        let mut combined = admitted;
        combined.append(&mut self.entries);
        combined.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));

        let mut buckets = HashSet::new();
        let mut reduced: Vec<NormalizedTransaction> = combined
            .into_iter()
            .filter(|tx| buckets.insert(bucket_of(tx.timestamp_ms)))
            .collect();
        reduced.truncate(self.capacity);

        self.entries = reduced;
        self.rebuild_index();
        self.seeded = true;

        MergeOutcome {
            new_hashes: admitted_hashes
                .into_iter()
                .filter(|h| self.index.contains(h))
                .collect(),
        }
    }

    fn rebuild_index(&mut self) {
        self.index = self.entries.iter().map(|tx| tx.hash.clone()).collect();
    }

    pub fn entries(&self) -> &[NormalizedTransaction] {
        &self.entries
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.index.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether an initial load (or any merge) has populated the window
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Drop everything, e.g. on pair change
    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.seeded = false;
    }
}
