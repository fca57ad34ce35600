use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use logscope_types::{ArcLogEntry, Level, LogEntry, WatchValue};

use crate::buffer::RingBuffer;

/// Capacity and load limits for a store and the views reading it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreLimits {
    /// Entries kept in memory before the oldest are evicted
    pub max_buffer_entries: usize,

    /// Entries requested from history when a connection opens
    pub initial_load_limit: usize,

    /// Rows a view materializes from the store at once
    pub max_grid_rows: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_buffer_entries: 10_000,
            initial_load_limit: 1_000,
            max_grid_rows: 5_000,
        }
    }
}

/// Result of an append
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub appended: usize,
    pub evicted: usize,
    pub duplicates: usize,
}

/// Counts per log level
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub debug: usize,
    pub verbose: usize,
    pub message: usize,
    pub warning: usize,
    pub error: usize,
    pub fatal: usize,
}

impl LevelCounts {
    pub fn total(&self) -> usize {
        self.debug + self.verbose + self.message + self.warning + self.error + self.fatal
    }

    pub fn get(&self, level: Level) -> usize {
        match level {
            Level::Debug => self.debug,
            Level::Verbose => self.verbose,
            Level::Message => self.message,
            Level::Warning => self.warning,
            Level::Error => self.error,
            Level::Fatal => self.fatal,
        }
    }

    fn slot(&mut self, level: Level) -> &mut usize {
        match level {
            Level::Debug => &mut self.debug,
            Level::Verbose => &mut self.verbose,
            Level::Message => &mut self.message,
            Level::Warning => &mut self.warning,
            Level::Error => &mut self.error,
            Level::Fatal => &mut self.fatal,
        }
    }

    fn increment(&mut self, level: Level) {
        *self.slot(level) += 1;
    }

    fn decrement(&mut self, level: Level) {
        let slot = self.slot(level);
        *slot = slot.saturating_sub(1);
    }
}

struct StoreInner {
    entries: RingBuffer<ArcLogEntry>,
    ids: HashSet<u64>,
    level_counts: LevelCounts,
    watches: BTreeMap<String, WatchValue>,
    limits: StoreLimits,
    entry_revision: u64,
    watch_revision: u64,
}

impl StoreInner {
    fn evict(&mut self, entry: &LogEntry) {
        self.ids.remove(&entry.id);
        self.level_counts.decrement(entry.level);
    }

    fn reset_entries(&mut self) {
        self.entries.clear();
        self.ids.clear();
        self.level_counts = LevelCounts::default();
        self.entry_revision += 1;
    }

    fn reset_watches(&mut self) {
        self.watches.clear();
        self.watch_revision += 1;
    }
}

/// Bounded, thread-safe store of log entries and watch values
///
/// Cloning the store yields another handle to the same data. Every mutation
/// takes a single write lock, so readers never observe a partial batch or a
/// half-cleared store.
#[derive(Clone)]
pub struct LogStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl LogStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                entries: RingBuffer::with_capacity(limits.max_buffer_entries),
                ids: HashSet::new(),
                level_counts: LevelCounts::default(),
                watches: BTreeMap::new(),
                limits,
                entry_revision: 0,
                watch_revision: 0,
            })),
        }
    }

    pub fn limits(&self) -> StoreLimits {
        self.inner.read().limits
    }

    /// Replace the limits, evicting down to the new capacity immediately
    pub fn set_limits(&self, limits: StoreLimits) -> usize {
        let mut inner = self.inner.write();
        inner.limits = limits;
        if inner.entries.capacity() == limits.max_buffer_entries.max(1) {
            return 0;
        }

        let evicted = inner.entries.set_capacity(limits.max_buffer_entries);
        for entry in &evicted {
            inner.evict(entry);
        }
        if !evicted.is_empty() {
            inner.entry_revision += 1;
            debug!(evicted = evicted.len(), "Store shrunk");
        }
        evicted.len()
    }

    /// Append a single entry
    pub fn append(&self, entry: LogEntry) -> AppendOutcome {
        self.append_batch(std::iter::once(entry))
    }

    /// Append entries in order, evicting the oldest past capacity
    ///
    /// Entries whose id is already held are skipped. When the batch alone
    /// exceeds capacity only its newest entries are written.
    pub fn append_batch<I>(&self, entries: I) -> AppendOutcome
    where
        I: IntoIterator<Item = LogEntry>,
    {
        let mut inner = self.inner.write();
        let mut outcome = AppendOutcome::default();

        let mut fresh = Vec::new();
        for entry in entries {
            if inner.ids.insert(entry.id) {
                fresh.push(entry);
            } else {
                outcome.duplicates += 1;
            }
        }

        let overflow = fresh.len().saturating_sub(inner.entries.capacity());
        for dropped in fresh.drain(..overflow) {
            inner.ids.remove(&dropped.id);
            outcome.evicted += 1;
        }

        for entry in fresh {
            inner.level_counts.increment(entry.level);
            if let Some(old) = inner.entries.push(Arc::new(entry)) {
                inner.evict(&old);
                outcome.evicted += 1;
            }
            outcome.appended += 1;
        }

        if outcome.appended > 0 {
            inner.entry_revision += 1;
        }
        outcome
    }

    /// Insert or overwrite a watch by name
    pub fn upsert_watch(&self, watch: WatchValue) {
        self.upsert_watch_batch(std::iter::once(watch));
    }

    /// Insert or overwrite watches by name, last write wins
    pub fn upsert_watch_batch<I>(&self, watches: I) -> usize
    where
        I: IntoIterator<Item = WatchValue>,
    {
        let mut inner = self.inner.write();
        let mut count = 0;
        for watch in watches {
            inner.watches.insert(watch.name.clone(), watch);
            count += 1;
        }
        if count > 0 {
            inner.watch_revision += 1;
        }
        count
    }

    pub fn clear_entries(&self) {
        self.inner.write().reset_entries();
    }

    pub fn clear_watches(&self) {
        self.inner.write().reset_watches();
    }

    /// Clear entries and watches under one lock
    pub fn clear_all(&self) {
        let mut inner = self.inner.write();
        inner.reset_entries();
        inner.reset_watches();
    }

    /// Total entry count
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<ArcLogEntry> {
        self.inner.read().entries.iter().cloned().collect()
    }

    /// Get the last N entries
    pub fn tail(&self, n: usize) -> Vec<ArcLogEntry> {
        let inner = self.inner.read();
        let start = inner.entries.len().saturating_sub(n);
        inner.entries.iter().skip(start).cloned().collect()
    }

    /// The newest `limit` entries accepted by `predicate`, oldest first
    pub fn visible<F>(&self, predicate: F, limit: usize) -> Vec<ArcLogEntry>
    where
        F: Fn(&LogEntry) -> bool,
    {
        let inner = self.inner.read();
        let mut rows: Vec<ArcLogEntry> = inner
            .entries
            .iter()
            .rev()
            .filter(|e| predicate(e))
            .take(limit)
            .cloned()
            .collect();
        rows.reverse();
        rows
    }

    /// Watches ordered by name
    pub fn watches(&self) -> Vec<WatchValue> {
        self.inner.read().watches.values().cloned().collect()
    }

    pub fn watch(&self, name: &str) -> Option<WatchValue> {
        self.inner.read().watches.get(name).cloned()
    }

    pub fn watch_count(&self) -> usize {
        self.inner.read().watches.len()
    }

    /// Get entry count per log level
    pub fn level_counts(&self) -> LevelCounts {
        self.inner.read().level_counts
    }

    /// Bumped on every change to the entry set
    pub fn entry_revision(&self) -> u64 {
        self.inner.read().entry_revision
    }

    /// Bumped on every change to the watch set
    pub fn watch_revision(&self) -> u64 {
        self.inner.read().watch_revision
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("LogStore")
            .field("entries", &inner.entries.len())
            .field("watches", &inner.watches.len())
            .field("limits", &inner.limits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_capacity(max: usize) -> LogStore {
        LogStore::new(StoreLimits {
            max_buffer_entries: max,
            ..StoreLimits::default()
        })
    }

    fn entry(id: u64) -> LogEntry {
        LogEntry::new(id, format!("e{id}"))
    }

    fn ids(store: &LogStore) -> Vec<u64> {
        store.entries().iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_evicts_oldest_first() {
        let store = store_with_capacity(3);
        for id in 1..=4 {
            store.append(entry(id));
        }
        assert_eq!(ids(&store), vec![2, 3, 4]);
    }

    #[test]
    fn test_batch_append_outcome() {
        let store = store_with_capacity(3);
        store.append_batch([entry(1), entry(2)]);
        let outcome = store.append_batch([entry(3), entry(4), entry(5)]);
        assert_eq!(
            outcome,
            AppendOutcome {
                appended: 3,
                evicted: 2,
                duplicates: 0
            }
        );
        assert_eq!(ids(&store), vec![3, 4, 5]);
    }

    #[test]
    fn test_oversized_batch_keeps_tail() {
        let store = store_with_capacity(3);
        store.append(entry(100));
        let outcome = store.append_batch((1..=10).map(entry));
        assert_eq!(ids(&store), vec![8, 9, 10]);
        assert_eq!(outcome.appended, 3);
        assert_eq!(outcome.evicted, 8);
        assert_eq!(store.level_counts().total(), 3);
    }

    #[test]
    fn test_duplicate_ids_skipped() {
        let store = store_with_capacity(10);
        store.append_batch([entry(1), entry(2)]);
        let outcome = store.append_batch([entry(2), entry(3), entry(3)]);
        assert_eq!(outcome.appended, 1);
        assert_eq!(outcome.duplicates, 2);
        assert_eq!(ids(&store), vec![1, 2, 3]);
    }

    #[test]
    fn test_evicted_id_can_return() {
        let store = store_with_capacity(2);
        store.append_batch([entry(1), entry(2), entry(3)]);
        let outcome = store.append(entry(1));
        assert_eq!(outcome.appended, 1);
        assert_eq!(ids(&store), vec![3, 1]);
    }

    #[test]
    fn test_level_counts_follow_eviction() {
        let store = store_with_capacity(2);
        store.append(entry(1).with_level(Level::Error));
        store.append(entry(2).with_level(Level::Warning));
        store.append(entry(3).with_level(Level::Warning));

        let counts = store.level_counts();
        assert_eq!(counts.error, 0);
        assert_eq!(counts.warning, 2);
        assert_eq!(counts.get(Level::Warning), 2);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn test_shrinking_limits_evicts_now() {
        let store = store_with_capacity(5);
        store.append_batch((1..=5).map(entry));
        let evicted = store.set_limits(StoreLimits {
            max_buffer_entries: 2,
            ..store.limits()
        });
        assert_eq!(evicted, 3);
        assert_eq!(ids(&store), vec![4, 5]);
        assert_eq!(store.level_counts().total(), 2);

        store.append(entry(6));
        assert_eq!(ids(&store), vec![5, 6]);
    }

    #[test]
    fn test_watch_last_write_wins() {
        let store = LogStore::default();
        store.upsert_watch_batch([
            WatchValue::new("cpu", "10"),
            WatchValue::new("mem", "1GB"),
            WatchValue::new("cpu", "42"),
        ]);
        assert_eq!(store.watch_count(), 2);
        assert_eq!(store.watch("cpu").map(|w| w.value), Some("42".to_string()));
    }

    #[test]
    fn test_clear_variants() {
        let store = LogStore::default();
        store.append(entry(1));
        store.upsert_watch(WatchValue::new("cpu", "1"));

        store.clear_entries();
        assert!(store.is_empty());
        assert_eq!(store.watch_count(), 1);

        store.append(entry(1));
        store.clear_watches();
        assert_eq!(store.len(), 1);
        assert_eq!(store.watch_count(), 0);

        store.upsert_watch(WatchValue::new("cpu", "1"));
        store.clear_all();
        assert!(store.is_empty());
        assert_eq!(store.watch_count(), 0);
        assert_eq!(store.level_counts(), LevelCounts::default());
    }

    #[test]
    fn test_revisions() {
        let store = LogStore::default();
        let before = store.entry_revision();
        store.append(entry(1));
        assert!(store.entry_revision() > before);

        let after_append = store.entry_revision();
        store.append(entry(1));
        assert_eq!(store.entry_revision(), after_append);

        let watch_before = store.watch_revision();
        store.upsert_watch(WatchValue::new("a", "b"));
        assert!(store.watch_revision() > watch_before);
        assert_eq!(store.entry_revision(), after_append);
    }

    #[test]
    fn test_visible_returns_newest_matches_in_order() {
        let store = LogStore::default();
        store.append_batch((1..=10).map(entry));
        let rows = store.visible(|e| e.id % 2 == 0, 3);
        let ids: Vec<u64> = rows.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![6, 8, 10]);
    }

    #[test]
    fn test_clones_share_data() {
        let store = LogStore::default();
        let other = store.clone();
        other.append(entry(7));
        assert_eq!(ids(&store), vec![7]);
        assert_eq!(store.tail(5).len(), 1);
    }
}
