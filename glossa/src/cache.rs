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

use std::sync::Arc;

use glossa_common::{
    clock::ClockRef,
    entry::CacheEntry,
    error::{ErrorKind, Result},
    key::KeyGenerator,
};
use glossa_memory::{CacheStats, EntryStore};
use glossa_remote::{Connector, PoolStats, RemoteTier};
use glossa_storage::{BatchStore, StorageStats};

use crate::metrics::{MetricsReport, Recorder, Tier};

/// Multi-level cache: memory over remote key-value over persistent batches.
///
/// A lookup descends the tiers and promotes hits upward so later lookups are
/// served faster. A write lands in the memory tier first; that write is
/// authoritative and its failure fails the call, while the lower tiers are
/// written best-effort. The cache never retries a tier operation; retry and
/// backoff policy belongs to the caller.
pub struct TieredCache<C>
where
    C: Connector + Clone,
{
    pub(crate) keygen: Arc<KeyGenerator>,
    pub(crate) memory: Arc<EntryStore>,
    pub(crate) remote: Arc<RemoteTier<C>>,
    pub(crate) storage: Arc<BatchStore>,
    pub(crate) clock: ClockRef,
    pub(crate) metrics: Arc<Recorder>,
}

impl<C> Clone for TieredCache<C>
where
    C: Connector + Clone,
{
    fn clone(&self) -> Self {
        Self {
            keygen: self.keygen.clone(),
            memory: self.memory.clone(),
            remote: self.remote.clone(),
            storage: self.storage.clone(),
            clock: self.clock.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<C> std::fmt::Debug for TieredCache<C>
where
    C: Connector + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache").field("memory", &self.memory).finish()
    }
}

impl<C> TieredCache<C>
where
    C: Connector + Clone,
{
    /// Build an entry for a freshly computed translation, deriving its key.
    pub fn entry(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
        translation: impl Into<String>,
    ) -> Result<CacheEntry> {
        let key = self.keygen.generate(source_text, source_lang, target_lang)?;
        Ok(CacheEntry::new(key, source_text, source_lang, target_lang, translation))
    }

    /// Look a key up across the tiers, promoting a lower-tier hit upward.
    ///
    /// A lower-tier read error is logged and treated as a miss for that tier;
    /// the entry may still be found further down.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let start = self.clock.now_ms();

        if let Some(entry) = self.memory.get(key) {
            self.metrics.record_hit(Tier::Memory, self.elapsed_since(start));
            return Ok(Some(entry));
        }

        match self.remote.get(key).await {
            Ok(Some(entry)) => {
                if let Err(e) = self.memory.promote(entry.clone()) {
                    tracing::warn!(key, error = %e, "failed to promote entry into memory tier");
                }
                self.metrics.record_hit(Tier::Remote, self.elapsed_since(start));
                return Ok(Some(entry));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key, error = %e, "remote tier lookup failed, descending"),
        }

        match self.storage.find(key).await {
            Ok(Some(entry)) => {
                if let Err(e) = self.remote.set(&entry).await {
                    tracing::warn!(key, error = %e, "failed to promote entry into remote tier");
                }
                if let Err(e) = self.memory.promote(entry.clone()) {
                    tracing::warn!(key, error = %e, "failed to promote entry into memory tier");
                }
                self.metrics.record_hit(Tier::Persistent, self.elapsed_since(start));
                return Ok(Some(entry));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key, error = %e, "persistent tier lookup failed"),
        }

        self.metrics.record_full_miss(self.elapsed_since(start));
        Ok(None)
    }

    /// Derive the key for a translation request and look it up.
    pub async fn lookup(&self, source_text: &str, source_lang: &str, target_lang: &str) -> Result<Option<CacheEntry>> {
        let key = self.keygen.generate(source_text, source_lang, target_lang)?;
        self.get(&key).await
    }

    /// Insert an entry into every tier.
    ///
    /// The memory write must succeed; remote and persistent writes are
    /// best-effort and their failures are logged, not surfaced. Returns the
    /// entry as stored, with its timestamp and default TTL stamped.
    pub async fn insert(&self, entry: CacheEntry) -> Result<CacheEntry> {
        let stored = self.memory.insert(entry)?;
        self.metrics.update_size(Tier::Memory, self.memory.len() as u64);

        if let Err(e) = self.remote.set(&stored).await {
            tracing::warn!(key = stored.key(), error = %e, "failed to write entry to remote tier");
        }

        self.storage.record_changes(1);
        if self.storage.needs_save() {
            if let Err(e) = self.flush_snapshot().await {
                tracing::warn!(error = %e, "failed to write persistent snapshot");
            }
        }

        Ok(stored)
    }

    /// Update an entry in every tier. Tiers that have not seen the entry yet
    /// report `NotFound`, which is tolerated; other failures surface.
    pub async fn update(&self, entry: &CacheEntry) -> Result<()> {
        match self.memory.update(entry) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        match self.remote.update(entry).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        self.storage.record_changes(1);
        Ok(())
    }

    /// Remove an entry from every tier, tolerating tiers that never saw it.
    ///
    /// The persistent tier keeps the entry in its current snapshot until the
    /// next snapshot write supersedes it.
    pub async fn remove(&self, key: &str) -> Result<()> {
        match self.memory.remove(key) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        match self.remote.delete(key).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        self.storage.record_changes(1);
        self.metrics.update_size(Tier::Memory, self.memory.len() as u64);
        Ok(())
    }

    /// Whether a live entry exists in the memory or remote tier.
    pub async fn contains(&self, key: &str) -> bool {
        if self.memory.contains(key) {
            return true;
        }
        match self.remote.exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(key, error = %e, "remote existence check failed");
                false
            }
        }
    }

    /// Fan expiry out to every tier: sweep the memory store, compact the
    /// newest persistent snapshot, and leave the remote tier to its
    /// service-native TTL. Returns the total number of entries dropped.
    pub async fn evict_expired(&self) -> Result<usize> {
        let memory_removed = self.memory.clear_expired();

        let remote_removed = self.remote.evict_expired();

        let persistent_removed = self.storage.compact_expired().await?;
        self.metrics.add_evictions(Tier::Persistent, persistent_removed as u64);
        self.metrics.update_size(Tier::Memory, self.memory.len() as u64);

        Ok(memory_removed + remote_removed + persistent_removed)
    }

    /// Persist everything that can be persisted: back the remote tier up
    /// into the storage directory (when its persistence is enabled), write a
    /// snapshot of the memory tier, and save the storage metadata.
    pub async fn save_all(&self) -> Result<()> {
        if self.remote.snapshot_enabled() {
            let backup = self.storage.dir().join("remote_backup.snapshot");
            self.remote.backup(backup).await?;
        }
        self.flush_snapshot().await
    }

    /// Load entries from the newest persistent snapshot into the memory
    /// tier, e.g. after a restart. Returns the number of entries recovered.
    pub async fn recover(&self, limit: usize) -> Result<usize> {
        let entries = match self.storage.load_batch(0, limit).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let now = self.clock.now_ms();
        let mut recovered = 0;
        for entry in entries {
            if entry.is_expired(now) {
                continue;
            }
            match self.memory.promote(entry) {
                Ok(_) => recovered += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "memory tier full during recovery");
                    break;
                }
            }
        }
        self.metrics.update_size(Tier::Memory, self.memory.len() as u64);
        tracing::info!(recovered, "recovered entries from persistent tier");
        Ok(recovered)
    }

    /// Drop every entry from every tier.
    pub async fn clear(&self) -> Result<()> {
        self.memory.clear();
        self.remote.flush_all().await?;
        self.storage.clear_all().await?;
        self.metrics.update_size(Tier::Memory, 0);
        Ok(())
    }

    /// Flush pending persistent state and tear down the remote pool.
    pub async fn close(&self) -> Result<()> {
        if self.storage.pending_changes() > 0 {
            self.flush_snapshot().await?;
        }
        self.remote.close().await;
        Ok(())
    }

    /// Per-tier and aggregate metrics.
    pub fn metrics(&self) -> MetricsReport {
        self.metrics
            .report(self.memory.stats().evictions, self.memory.len() as u64)
    }

    /// Memory tier counters.
    pub fn memory_stats(&self) -> CacheStats {
        self.memory.stats()
    }

    /// Remote tier pool counters.
    pub async fn remote_stats(&self) -> PoolStats {
        self.remote.stats().await
    }

    /// Persistent tier counters.
    pub fn storage_stats(&self) -> StorageStats {
        self.storage.stats()
    }

    /// Direct access to the memory tier.
    pub fn memory(&self) -> &EntryStore {
        &self.memory
    }

    /// Direct access to the remote tier.
    pub fn remote(&self) -> &RemoteTier<C> {
        &self.remote
    }

    /// Direct access to the persistent tier.
    pub fn storage(&self) -> &BatchStore {
        &self.storage
    }

    /// Write the memory tier's live entries as one persistent snapshot and
    /// save the storage metadata.
    async fn flush_snapshot(&self) -> Result<()> {
        let entries = self.memory.entries();
        if !entries.is_empty() {
            self.storage.save_batch(&entries).await?;
        }
        self.storage.save_all().await
    }

    fn elapsed_since(&self, start: u64) -> u64 {
        self.clock.now_ms().saturating_sub(start)
    }
}
