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

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters of the persistent tier, updated per operation.
#[derive(Debug, Default)]
pub struct Statistics {
    /// Completed batch or metadata save operations.
    pub total_saves: AtomicU64,
    /// Completed batch load operations.
    pub total_loads: AtomicU64,
    /// Failed save or load operations.
    pub failed_operations: AtomicU64,
    /// Bytes written to batch and metadata files.
    pub bytes_written: AtomicU64,
    /// Bytes read from batch and metadata files.
    pub bytes_read: AtomicU64,
    /// Clock reading of the most recent save.
    pub last_save_time: AtomicU64,
    /// Clock reading of the most recent load.
    pub last_load_time: AtomicU64,
}

impl Statistics {
    /// Read-only snapshot of the counters.
    pub fn snapshot(&self) -> StorageStats {
        StorageStats {
            total_saves: self.total_saves.load(Ordering::Relaxed),
            total_loads: self.total_loads.load(Ordering::Relaxed),
            failed_operations: self.failed_operations.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            last_save_time: self.last_save_time.load(Ordering::Relaxed),
            last_load_time: self.last_load_time.load(Ordering::Relaxed),
        }
    }

    /// Overwrite the counters, e.g. from a recovered metadata snapshot.
    pub fn restore(&self, stats: &StorageStats) {
        self.total_saves.store(stats.total_saves, Ordering::Relaxed);
        self.total_loads.store(stats.total_loads, Ordering::Relaxed);
        self.failed_operations.store(stats.failed_operations, Ordering::Relaxed);
        self.bytes_written.store(stats.bytes_written, Ordering::Relaxed);
        self.bytes_read.store(stats.bytes_read, Ordering::Relaxed);
        self.last_save_time.store(stats.last_save_time, Ordering::Relaxed);
        self.last_load_time.store(stats.last_load_time, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`Statistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Completed batch or metadata save operations.
    pub total_saves: u64,
    /// Completed batch load operations.
    pub total_loads: u64,
    /// Failed save or load operations.
    pub failed_operations: u64,
    /// Bytes written to batch and metadata files.
    pub bytes_written: u64,
    /// Bytes read from batch and metadata files.
    pub bytes_read: u64,
    /// Clock reading of the most recent save.
    pub last_save_time: u64,
    /// Clock reading of the most recent load.
    pub last_load_time: u64,
}
