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

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use bytes::{Buf, BufMut, BytesMut};
use glossa_common::{
    clock::ClockRef,
    entry::CacheEntry,
    error::{Error, ErrorKind, Result},
};
use serde::{Deserialize, Serialize};

use crate::{
    codec::{decode_batch, encode_batch},
    statistics::{Statistics, StorageStats},
};

const METADATA_FILE: &str = "metadata.bin";
const META_MAGIC: u32 = 0x5443_4C4D;
const META_VERSION: u32 = 1;
const TEMP_SUFFIX: &str = ".tmp";

/// Persistent tier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding batch and metadata files. Created on open.
    pub dir: PathBuf,
    /// Whether [`BatchStore::needs_save`] ever reports true.
    pub enable_auto_save: bool,
    /// Minimum interval between auto-save snapshots, in milliseconds.
    pub auto_save_interval_ms: u64,
    /// Largest entry count accepted per batch file.
    pub max_batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./glossa_storage"),
            enable_auto_save: true,
            auto_save_interval_ms: 15 * 60 * 1000,
            max_batch_size: 1000,
        }
    }
}

/// Durable batch-file store.
///
/// Every save writes one immutable snapshot file named by its creation
/// timestamp; recovery always targets the single newest snapshot, so older
/// batch files are superseded history and are pruned by
/// [`BatchStore::compact_expired`]. Writes go to a temp file first and are
/// renamed into place, so a crash never leaves a half-written snapshot under
/// a live name.
#[derive(Debug)]
pub struct BatchStore {
    config: StorageConfig,
    clock: ClockRef,
    stats: Statistics,
    pending_changes: AtomicU64,
    last_auto_save: AtomicU64,
}

impl BatchStore {
    /// Open the store, creating the storage directory if needed. A directory
    /// that cannot be created is fatal; unreadable metadata is not.
    pub async fn open(config: StorageConfig, clock: ClockRef) -> Result<Self> {
        tokio::fs::create_dir_all(&config.dir)
            .await
            .map_err(|e| Error::new(ErrorKind::Storage, "failed to create storage directory").with_source(e))?;

        let store = Self {
            last_auto_save: AtomicU64::new(clock.now_ms()),
            config,
            clock,
            stats: Statistics::default(),
            pending_changes: AtomicU64::new(0),
        };

        match store.read_metadata().await {
            Ok(Some(stats)) => store.stats.restore(&stats),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable storage metadata"),
        }

        tracing::info!(dir = %store.config.dir.display(), "batch store opened");
        Ok(store)
    }

    /// Write one immutable batch file holding `entries`.
    pub async fn save_batch(&self, entries: &[CacheEntry]) -> Result<PathBuf> {
        if entries.is_empty() {
            return Err(Error::new(ErrorKind::InvalidParam, "refusing to write an empty batch"));
        }
        if entries.len() > self.config.max_batch_size {
            return Err(Error::new(ErrorKind::InvalidParam, "batch exceeds max_batch_size")
                .with_context("len", entries.len())
                .with_context("max_batch_size", self.config.max_batch_size));
        }

        let encoded = encode_batch(entries);
        let path = match self.write_batch_file(&encoded).await {
            Ok(path) => path,
            Err(e) => {
                self.stats.failed_operations.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        self.stats.total_saves.fetch_add(1, Ordering::Relaxed);
        self.stats.bytes_written.fetch_add(encoded.len() as u64, Ordering::Relaxed);
        self.stats.last_save_time.store(self.clock.now_ms(), Ordering::Relaxed);

        tracing::debug!(count = entries.len(), path = %path.display(), "saved batch");
        Ok(path)
    }

    /// Load up to `count` entries from the newest batch after skipping
    /// `offset`. Fails with [`ErrorKind::NotFound`] when no batch exists and
    /// [`ErrorKind::InvalidFormat`] on a corrupt file.
    pub async fn load_batch(&self, offset: usize, count: usize) -> Result<Vec<CacheEntry>> {
        let Some((path, _)) = self.newest_batch().await? else {
            return Err(Error::new(ErrorKind::NotFound, "no batch file present"));
        };

        let result = self.read_and_decode(&path, offset, count).await;
        match result {
            Ok((entries, total)) => {
                self.stats.total_loads.fetch_add(1, Ordering::Relaxed);
                self.stats.last_load_time.store(self.clock.now_ms(), Ordering::Relaxed);
                tracing::debug!(loaded = entries.len(), total, path = %path.display(), "loaded batch");
                Ok(entries)
            }
            Err(e) => {
                self.stats.failed_operations.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Look `key` up in the newest snapshot. Entries already expired at the
    /// current clock reading are not resurrected.
    pub async fn find(&self, key: &str) -> Result<Option<CacheEntry>> {
        let Some((path, _)) = self.newest_batch().await? else {
            return Ok(None);
        };
        let (entries, _) = match self.read_and_decode(&path, 0, usize::MAX).await {
            Ok(decoded) => decoded,
            Err(e) => {
                self.stats.failed_operations.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        self.stats.total_loads.fetch_add(1, Ordering::Relaxed);
        self.stats.last_load_time.store(self.clock.now_ms(), Ordering::Relaxed);

        let now = self.clock.now_ms();
        Ok(entries.into_iter().find(|e| e.key() == key && !e.is_expired(now)))
    }

    /// Rewrite the newest snapshot without its expired entries and prune
    /// superseded batch files. Returns the number of entries dropped.
    pub async fn compact_expired(&self) -> Result<usize> {
        let batches = self.batch_files().await?;
        let Some((newest_path, _)) = batches.last().cloned() else {
            return Ok(0);
        };

        let (entries, total) = self.read_and_decode(&newest_path, 0, usize::MAX).await?;
        let now = self.clock.now_ms();
        let live: Vec<_> = entries.into_iter().filter(|e| !e.is_expired(now)).collect();
        let removed = total - live.len();

        if !live.is_empty() {
            let encoded = encode_batch(&live);
            self.write_batch_file(&encoded).await?;
            self.stats.bytes_written.fetch_add(encoded.len() as u64, Ordering::Relaxed);
            self.stats.total_saves.fetch_add(1, Ordering::Relaxed);
        }

        // Everything up to and including the compacted snapshot is superseded.
        for (path, _) in &batches {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to prune batch file");
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "compacted expired entries out of newest snapshot");
        }
        Ok(removed)
    }

    /// Record `count` not-yet-persisted changes for the auto-save policy.
    pub fn record_changes(&self, count: u64) {
        self.pending_changes.fetch_add(count, Ordering::Relaxed);
    }

    /// Whether enough changes and time have accumulated to warrant a save.
    pub fn needs_save(&self) -> bool {
        if !self.config.enable_auto_save {
            return false;
        }
        if self.pending_changes.load(Ordering::Relaxed) == 0 {
            return false;
        }
        let elapsed = self
            .clock
            .now_ms()
            .saturating_sub(self.last_auto_save.load(Ordering::Relaxed));
        elapsed >= self.config.auto_save_interval_ms
    }

    /// Write the metadata snapshot and reset the pending-change counter.
    pub async fn save_all(&self) -> Result<()> {
        let now = self.clock.now_ms();
        self.stats.last_save_time.store(now, Ordering::Relaxed);
        self.stats.total_saves.fetch_add(1, Ordering::Relaxed);

        self.write_metadata().await?;

        self.pending_changes.store(0, Ordering::Relaxed);
        self.last_auto_save.store(now, Ordering::Relaxed);
        tracing::debug!("storage state saved");
        Ok(())
    }

    /// Remove every batch and metadata file and reset the counters.
    pub async fn clear_all(&self) -> Result<()> {
        for (path, _) in self.batch_files().await? {
            tokio::fs::remove_file(&path).await.map_err(Error::io_error)?;
        }
        let metadata = self.config.dir.join(METADATA_FILE);
        if tokio::fs::try_exists(&metadata).await.map_err(Error::io_error)? {
            tokio::fs::remove_file(&metadata).await.map_err(Error::io_error)?;
        }

        self.stats.restore(&StorageStats::default());
        self.pending_changes.store(0, Ordering::Relaxed);
        tracing::info!("storage cleared");
        Ok(())
    }

    /// Flush pending state before drop. Writes metadata only when there are
    /// unpersisted changes.
    pub async fn close(&self) -> Result<()> {
        if self.pending_changes.load(Ordering::Relaxed) > 0 {
            self.save_all().await?;
        }
        Ok(())
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StorageStats {
        self.stats.snapshot()
    }

    /// The storage directory.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Changes recorded since the last save.
    pub fn pending_changes(&self) -> u64 {
        self.pending_changes.load(Ordering::Relaxed)
    }

    async fn write_batch_file(&self, encoded: &[u8]) -> Result<PathBuf> {
        let mut ts = self.clock.now_ms();
        let mut path = self.batch_path(ts);
        while tokio::fs::try_exists(&path).await.map_err(Error::io_error)? {
            ts += 1;
            path = self.batch_path(ts);
        }

        let temp = path.with_extension("bin.tmp");
        tokio::fs::write(&temp, encoded).await.map_err(Error::io_error)?;
        tokio::fs::rename(&temp, &path).await.map_err(Error::io_error)?;
        Ok(path)
    }

    fn batch_path(&self, timestamp: u64) -> PathBuf {
        self.config.dir.join(format!("batch_{timestamp}.bin"))
    }

    async fn read_and_decode(&self, path: &Path, offset: usize, count: usize) -> Result<(Vec<CacheEntry>, usize)> {
        let bytes = tokio::fs::read(path).await.map_err(Error::io_error)?;
        self.stats.bytes_read.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        decode_batch(&bytes, offset, count)
    }

    /// Batch files in the storage directory, sorted oldest to newest.
    async fn batch_files(&self) -> Result<Vec<(PathBuf, u64)>> {
        let mut dir = tokio::fs::read_dir(&self.config.dir)
            .await
            .map_err(|e| Error::new(ErrorKind::Storage, "failed to list storage directory").with_source(e))?;

        let mut batches = Vec::new();
        while let Some(dirent) = dir.next_entry().await.map_err(Error::io_error)? {
            let name = dirent.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(ts) = parse_batch_name(name) {
                batches.push((dirent.path(), ts));
            }
        }
        batches.sort_by_key(|(_, ts)| *ts);
        Ok(batches)
    }

    async fn newest_batch(&self) -> Result<Option<(PathBuf, u64)>> {
        Ok(self.batch_files().await?.pop())
    }

    async fn write_metadata(&self) -> Result<()> {
        let stats = self.stats.snapshot();
        let mut buf = BytesMut::new();
        buf.put_u32_le(META_MAGIC);
        buf.put_u32_le(META_VERSION);
        buf.put_u64_le(stats.total_saves);
        buf.put_u64_le(stats.total_loads);
        buf.put_u64_le(stats.failed_operations);
        buf.put_u64_le(stats.bytes_written);
        buf.put_u64_le(stats.bytes_read);
        buf.put_u64_le(stats.last_save_time);
        buf.put_u64_le(stats.last_load_time);

        let path = self.config.dir.join(METADATA_FILE);
        let temp = path.with_extension("bin.tmp");
        tokio::fs::write(&temp, &buf).await.map_err(Error::io_error)?;
        tokio::fs::rename(&temp, &path).await.map_err(Error::io_error)?;

        self.stats.bytes_written.fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn read_metadata(&self) -> Result<Option<StorageStats>> {
        let path = self.config.dir.join(METADATA_FILE);
        if !tokio::fs::try_exists(&path).await.map_err(Error::io_error)? {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path).await.map_err(Error::io_error)?;
        let mut buf = bytes.as_slice();
        if buf.remaining() < 8 + 7 * 8 {
            return Err(Error::new(ErrorKind::InvalidFormat, "metadata file is truncated"));
        }
        let magic = buf.get_u32_le();
        let version = buf.get_u32_le();
        if magic != META_MAGIC || version != META_VERSION {
            return Err(Error::new(ErrorKind::InvalidFormat, "bad metadata header"));
        }

        Ok(Some(StorageStats {
            total_saves: buf.get_u64_le(),
            total_loads: buf.get_u64_le(),
            failed_operations: buf.get_u64_le(),
            bytes_written: buf.get_u64_le(),
            bytes_read: buf.get_u64_le(),
            last_save_time: buf.get_u64_le(),
            last_load_time: buf.get_u64_le(),
        }))
    }
}

fn parse_batch_name(name: &str) -> Option<u64> {
    name.strip_prefix("batch_")?.strip_suffix(".bin")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glossa_common::clock::MockClock;
    use tempfile::TempDir;

    use super::*;

    fn config(dir: &TempDir) -> StorageConfig {
        StorageConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    async fn store(dir: &TempDir, clock: &Arc<MockClock>) -> BatchStore {
        BatchStore::open(config(dir), clock.clone() as ClockRef).await.unwrap()
    }

    fn entry(key: &str, value: &str, timestamp: u64, ttl: u64, flags: u32) -> CacheEntry {
        CacheEntry::from_persisted(key, value, timestamp, ttl, flags)
    }

    #[test_log::test(tokio::test)]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(1_000));
        let store = store(&dir, &clock).await;

        let entries = vec![
            entry("en:fr:00c0ffee", "bonjour", 500, 60_000, 0),
            entry("en:de:00c0ffee", "hallo", 600, 30_000, 3),
        ];
        store.save_batch(&entries).await.unwrap();

        let loaded = store.load_batch(0, 10).await.unwrap();
        assert_eq!(loaded, entries);

        let stats = store.stats();
        assert_eq!(stats.total_saves, 1);
        assert_eq!(stats.total_loads, 1);
        assert!(stats.bytes_written > 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_load_targets_newest_batch_only() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(1_000));
        let store = store(&dir, &clock).await;

        store.save_batch(&[entry("old", "v1", 0, 1_000, 0)]).await.unwrap();
        clock.set(2_000);
        store.save_batch(&[entry("new", "v2", 0, 1_000, 0)]).await.unwrap();

        let loaded = store.load_batch(0, 10).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key(), "new");
    }

    #[test_log::test(tokio::test)]
    async fn test_same_millisecond_batches_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(1_000));
        let store = store(&dir, &clock).await;

        store.save_batch(&[entry("a", "v", 0, 1_000, 0)]).await.unwrap();
        store.save_batch(&[entry("b", "v", 0, 1_000, 0)]).await.unwrap();

        // The second write lands under a bumped timestamp and wins recovery.
        let loaded = store.load_batch(0, 10).await.unwrap();
        assert_eq!(loaded[0].key(), "b");
    }

    #[test_log::test(tokio::test)]
    async fn test_corrupt_magic_fails_without_crashing() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(1_000));
        let store = store(&dir, &clock).await;

        let path = store.save_batch(&[entry("k", "v", 0, 1_000, 0)]).await.unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let err = store.load_batch(0, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert_eq!(store.stats().failed_operations, 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_load_without_batches_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(0));
        let store = store(&dir, &clock).await;

        let err = store.load_batch(0, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test_log::test(tokio::test)]
    async fn test_offset_paging() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(0));
        let store = store(&dir, &clock).await;

        let entries: Vec<_> = (0..5)
            .map(|i| entry(&format!("k{i}"), "v", i, 1_000, 0))
            .collect();
        store.save_batch(&entries).await.unwrap();

        let page = store.load_batch(3, 10).await.unwrap();
        assert_eq!(page, entries[3..]);
    }

    #[test_log::test(tokio::test)]
    async fn test_find_skips_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(0));
        let store = store(&dir, &clock).await;

        store
            .save_batch(&[
                entry("fresh", "v", 0, 10_000, 0),
                entry("stale", "v", 0, 100, 0),
            ])
            .await
            .unwrap();

        clock.set(5_000);
        assert!(store.find("fresh").await.unwrap().is_some());
        assert!(store.find("stale").await.unwrap().is_none());
        assert!(store.find("absent").await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_compact_expired_drops_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(1_000));
        let store = store(&dir, &clock).await;

        store.save_batch(&[entry("gone-with-batch", "v", 0, 1, 0)]).await.unwrap();
        clock.set(2_000);
        store
            .save_batch(&[
                entry("live", "v", 2_000, 60_000, 0),
                entry("dead", "v", 0, 100, 0),
            ])
            .await
            .unwrap();

        clock.set(3_000);
        let removed = store.compact_expired().await.unwrap();
        assert_eq!(removed, 1);

        // One snapshot file remains, holding only the live entry.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|d| d.unwrap().file_name().into_string().unwrap())
            .filter(|n| n.starts_with("batch_"))
            .collect();
        assert_eq!(names.len(), 1);

        let loaded = store.load_batch(0, 10).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key(), "live");
    }

    #[test_log::test(tokio::test)]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(0));
        let store = store(&dir, &clock).await;

        store.save_batch(&[entry("k", "v", 0, 1_000, 0)]).await.unwrap();
        store.save_all().await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|d| d.unwrap().file_name().into_string().unwrap())
            .filter(|n| n.ends_with(TEMP_SUFFIX))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
    }

    #[test_log::test(tokio::test)]
    async fn test_metadata_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(0));
        {
            let store = store(&dir, &clock).await;
            store.save_batch(&[entry("k", "v", 0, 1_000, 0)]).await.unwrap();
            store.record_changes(1);
            store.save_all().await.unwrap();
        }

        let reopened = store(&dir, &clock).await;
        let stats = reopened.stats();
        // One batch save plus the save_all itself.
        assert_eq!(stats.total_saves, 2);
        assert!(stats.bytes_written > 0);
        assert_eq!(reopened.pending_changes(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_needs_save_policy() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(0));
        let config = StorageConfig {
            dir: dir.path().to_path_buf(),
            auto_save_interval_ms: 1_000,
            ..Default::default()
        };
        let store = BatchStore::open(config, clock.clone() as ClockRef).await.unwrap();

        assert!(!store.needs_save());
        store.record_changes(3);
        assert!(!store.needs_save(), "interval has not elapsed yet");
        clock.set(1_000);
        assert!(store.needs_save());

        store.save_all().await.unwrap();
        assert!(!store.needs_save());
    }

    #[test_log::test(tokio::test)]
    async fn test_clear_all() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(0));
        let store = store(&dir, &clock).await;

        store.save_batch(&[entry("k", "v", 0, 1_000, 0)]).await.unwrap();
        store.save_all().await.unwrap();
        store.clear_all().await.unwrap();

        assert_eq!(store.stats(), StorageStats::default());
        let err = store.load_batch(0, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test_log::test(tokio::test)]
    async fn test_empty_batch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(MockClock::with_now(0));
        let store = store(&dir, &clock).await;

        let err = store.save_batch(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);
    }
}
