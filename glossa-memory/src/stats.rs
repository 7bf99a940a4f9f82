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

use serde::{Deserialize, Serialize};

/// Running counters for one entry store.
///
/// `hits`, `misses`, and `evictions` are monotonic; the per-outcome averages
/// are incremental running means. The live entry count is derived from the
/// store, never stored here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups served from the store.
    pub hits: u64,
    /// Lookups that found nothing, including expired entries.
    pub misses: u64,
    /// Entries removed by eviction or the expiry sweep.
    pub evictions: u64,
    /// Running mean latency of hits, in milliseconds.
    pub avg_hit_time_ms: f64,
    /// Running mean latency of misses, in milliseconds.
    pub avg_miss_time_ms: f64,
}

impl CacheStats {
    pub(crate) fn record_hit(&mut self, elapsed_ms: u64) {
        self.hits += 1;
        self.avg_hit_time_ms += (elapsed_ms as f64 - self.avg_hit_time_ms) / self.hits as f64;
    }

    pub(crate) fn record_miss(&mut self, elapsed_ms: u64) {
        self.misses += 1;
        self.avg_miss_time_ms += (elapsed_ms as f64 - self.avg_miss_time_ms) / self.misses as f64;
    }

    pub(crate) fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }
}
