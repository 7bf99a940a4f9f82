// Copyright 2026 glossa Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use glossa_common::{
    clock::ClockRef,
    entry::CacheEntry,
    error::{Error, ErrorKind, Result},
};
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    eviction::{Eviction, EvictionConfig},
    stats::CacheStats,
};

/// Entry store configuration.
///
/// Immutable after construction except for the eviction policy, which can be
/// swapped at runtime via [`EntryStore::set_eviction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStoreConfig {
    /// Hard ceiling on live entries. The store never grows past it.
    pub max_entries: usize,
    /// TTL stamped onto entries inserted with a zero TTL.
    pub default_ttl_ms: u64,
    /// Victim selection policy.
    pub eviction: EvictionConfig,
    /// Entries evicted in one batch when an insert finds the store full.
    pub eviction_batch_size: usize,
    /// Free-slot floor restored by [`EntryStore::ensure_free_space`].
    pub min_free_entries: usize,
    /// Extend an entry's TTL on every hit.
    pub auto_extend_ttl: bool,
    /// Extension applied per hit when `auto_extend_ttl` is set.
    pub ttl_extension_ms: u64,
}

impl Default for EntryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_ms: 60 * 60 * 1000,
            eviction: EvictionConfig::default(),
            eviction_batch_size: 10,
            min_free_entries: 50,
            auto_extend_ttl: false,
            ttl_extension_ms: 6 * 60 * 60 * 1000,
        }
    }
}

struct StoreInner {
    entries: Vec<CacheEntry>,
    index: HashMap<String, usize>,
    eviction: Box<dyn Eviction>,
    stats: CacheStats,
}

/// Bounded in-memory entry store.
///
/// All state sits behind one exclusive lock: metadata read-modify-write,
/// eviction, and the expiry sweep are atomic with respect to each other.
/// Removal is always swap-remove, so entry order is not meaningful.
pub struct EntryStore {
    config: EntryStoreConfig,
    clock: ClockRef,
    inner: Mutex<StoreInner>,
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("config", &self.config)
            .field("len", &self.len())
            .finish()
    }
}

impl EntryStore {
    /// Build a store. Fails with [`ErrorKind::InvalidParam`] on a zero entry
    /// ceiling and [`ErrorKind::Memory`] when the backing storage cannot be
    /// reserved.
    pub fn new(config: EntryStoreConfig, clock: ClockRef) -> Result<Self> {
        if config.max_entries == 0 {
            return Err(Error::new(ErrorKind::InvalidParam, "max_entries must be positive"));
        }

        let mut entries = Vec::new();
        entries
            .try_reserve_exact(config.max_entries)
            .map_err(|e| Error::new(ErrorKind::Memory, "failed to reserve entry storage").with_source(e))?;

        let eviction = config.eviction.build();
        tracing::debug!(max_entries = config.max_entries, eviction = ?config.eviction, "entry store created");

        Ok(Self {
            config,
            clock,
            inner: Mutex::new(StoreInner {
                entries,
                index: HashMap::new(),
                eviction,
                stats: CacheStats::default(),
            }),
        })
    }

    /// Insert an entry, or replace the mutable fields of an entry already
    /// stored under the same key. Returns the entry as stored, with its
    /// timestamp, default TTL, and usage metadata stamped.
    ///
    /// A full store first evicts `eviction_batch_size` entries; if that fails
    /// to make room the insert fails with [`ErrorKind::Memory`].
    pub fn insert(&self, mut entry: CacheEntry) -> Result<CacheEntry> {
        entry.stamp_inserted(self.clock.now_ms(), self.config.default_ttl_ms);
        self.store(entry)
    }

    /// Insert an entry promoted from a lower tier, keeping its original
    /// timestamp, TTL, and usage metadata so promotion never refreshes an
    /// entry's validity window.
    pub fn promote(&self, entry: CacheEntry) -> Result<CacheEntry> {
        self.store(entry)
    }

    fn store(&self, entry: CacheEntry) -> Result<CacheEntry> {
        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.index.get(entry.key()) {
            let slot = &mut inner.entries[idx];
            slot.apply_update(&entry);
            return Ok(slot.clone());
        }

        if inner.entries.len() >= self.config.max_entries {
            let evicted = Self::evict_locked(&mut inner, self.config.eviction_batch_size);
            tracing::debug!(evicted, "store full, evicted a batch before insert");
        }
        if inner.entries.len() >= self.config.max_entries {
            return Err(Error::capacity(self.config.max_entries, inner.entries.len()));
        }

        let idx = inner.entries.len();
        inner.index.insert(entry.key().to_string(), idx);
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    /// Look up an entry.
    ///
    /// An expired entry is removed as a side effect and reported as a miss.
    /// A hit bumps the usage count, refreshes the last-used stamp, and, when
    /// configured, extends the TTL.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let start = self.clock.now_ms();
        let mut inner = self.inner.lock();

        let Some(&idx) = inner.index.get(key) else {
            let elapsed = self.clock.now_ms().saturating_sub(start);
            inner.stats.record_miss(elapsed);
            return None;
        };

        if inner.entries[idx].is_expired(start) {
            Self::remove_at(&mut inner, idx);
            let elapsed = self.clock.now_ms().saturating_sub(start);
            inner.stats.record_miss(elapsed);
            tracing::debug!(key, "entry found but expired");
            return None;
        }

        let auto_extend = self.config.auto_extend_ttl;
        let extension = self.config.ttl_extension_ms;
        let slot = &mut inner.entries[idx];
        slot.touch(start);
        if auto_extend {
            slot.extend_ttl(extension);
        }
        let copy = slot.clone();

        let elapsed = self.clock.now_ms().saturating_sub(start);
        inner.stats.record_hit(elapsed);
        Some(copy)
    }

    /// Whether a live (non-expired) entry exists for `key`. Does not touch
    /// usage metadata or remove anything.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let inner = self.inner.lock();
        inner
            .index
            .get(key)
            .is_some_and(|&idx| !inner.entries[idx].is_expired(now))
    }

    /// Remove the entry stored under `key`.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let Some(&idx) = inner.index.get(key) else {
            return Err(Error::not_found(key));
        };
        Self::remove_at(&mut inner, idx);
        Ok(())
    }

    /// Replace the mutable fields of the entry stored under `entry.key()`.
    pub fn update(&self, entry: &CacheEntry) -> Result<()> {
        let mut inner = self.inner.lock();
        let Some(&idx) = inner.index.get(entry.key()) else {
            return Err(Error::not_found(entry.key()));
        };
        inner.entries[idx].apply_update(entry);
        Ok(())
    }

    /// Evict up to `count` entries chosen by the configured policy. Returns
    /// the number actually evicted.
    pub fn evict(&self, count: usize) -> usize {
        let mut inner = self.inner.lock();
        Self::evict_locked(&mut inner, count)
    }

    /// Remove every expired entry in one sweep. Returns the number removed.
    ///
    /// Calling it again with no intervening writes removes nothing.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        let before = inner.entries.len();
        let mut i = 0;
        while i < inner.entries.len() {
            if inner.entries[i].is_expired(now) {
                // Swap-remove moves the tail entry into slot i; re-examine
                // the slot before advancing or the moved entry is skipped.
                Self::remove_at(&mut inner, i);
            } else {
                i += 1;
            }
        }

        let removed = before - inner.entries.len();
        inner.stats.record_evictions(removed as u64);
        if removed > 0 {
            tracing::debug!(removed, "cleared expired entries");
        }
        removed
    }

    /// Extend the TTL of the entry stored under `key`.
    pub fn extend_ttl(&self, key: &str, extension_ms: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        let Some(&idx) = inner.index.get(key) else {
            return Err(Error::not_found(key));
        };
        inner.entries[idx].extend_ttl(extension_ms);
        Ok(())
    }

    /// Evict until at least `min_free_entries` slots are free.
    pub fn ensure_free_space(&self) -> usize {
        let mut inner = self.inner.lock();
        let floor = self.config.min_free_entries.min(self.config.max_entries);
        let free = self.config.max_entries - inner.entries.len();
        if free >= floor {
            return 0;
        }
        Self::evict_locked(&mut inner, floor - free)
    }

    /// Swap the eviction policy at runtime.
    pub fn set_eviction(&self, config: EvictionConfig) {
        let mut inner = self.inner.lock();
        inner.eviction = config.build();
    }

    /// Live entry count.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free slots: `max_entries - len`.
    pub fn free(&self) -> usize {
        self.config.max_entries - self.len()
    }

    /// Occupancy as a percentage of `max_entries`.
    pub fn usage_percent(&self) -> f64 {
        self.len() as f64 * 100.0 / self.config.max_entries as f64
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    /// Snapshot of all live entries, e.g. for batch persistence.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.inner.lock().entries.clone()
    }

    /// Drop every entry. Counters are retained.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.index.clear();
    }

    fn evict_locked(inner: &mut StoreInner, count: usize) -> usize {
        let mut evicted = 0;
        for _ in 0..count {
            let Some(idx) = inner.eviction.victim(&inner.entries) else {
                break;
            };
            tracing::debug!(key = inner.entries[idx].key(), "evicting entry");
            Self::remove_at(inner, idx);
            evicted += 1;
        }
        inner.stats.record_evictions(evicted as u64);
        evicted
    }

    fn remove_at(inner: &mut StoreInner, idx: usize) -> CacheEntry {
        let removed = inner.entries.swap_remove(idx);
        inner.index.remove(removed.key());
        if idx < inner.entries.len() {
            let moved_key = inner.entries[idx].key().to_string();
            inner.index.insert(moved_key, idx);
        }
        removed
    }
}
