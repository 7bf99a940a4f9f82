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

use parking_lot::Mutex;

/// Which tier served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// In-memory entry store.
    Memory,
    /// Remote key-value service.
    Remote,
    /// On-disk batch store.
    Persistent,
}

/// Counters for one tier, as observed by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierMetrics {
    /// Lookups this tier answered.
    pub hits: u64,
    /// Lookups recorded as misses against this tier.
    pub misses: u64,
    /// Entries this tier dropped by eviction or expiry.
    pub evictions: u64,
    /// Running mean latency of the recorded operations, in milliseconds.
    pub avg_response_time_ms: f64,
    /// Live entries in this tier, where known.
    pub current_size: u64,
    /// High-water mark of `current_size`.
    pub peak_size: u64,
}

impl TierMetrics {
    fn record(&mut self, hit: bool, elapsed_ms: u64) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        let samples = (self.hits + self.misses) as f64;
        self.avg_response_time_ms += (elapsed_ms as f64 - self.avg_response_time_ms) / samples;
    }

    fn update_size(&mut self, current: u64) {
        self.current_size = current;
        if current > self.peak_size {
            self.peak_size = current;
        }
    }
}

/// Per-tier and aggregate metrics for one cache instance.
///
/// Aggregate hits, misses, evictions and sizes are sums across tiers; the
/// aggregate response time is the arithmetic mean of the tier averages, not a
/// weighted mean over individual calls. Good enough for a coarse dashboard,
/// not for latency SLAs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsReport {
    /// Memory tier.
    pub memory: TierMetrics,
    /// Remote tier.
    pub remote: TierMetrics,
    /// Persistent tier.
    pub persistent: TierMetrics,
    /// Sums across tiers, plus full-miss accounting.
    pub aggregate: TierMetrics,
}

#[derive(Debug, Default)]
struct RecorderInner {
    memory: TierMetrics,
    remote: TierMetrics,
    persistent: TierMetrics,
    /// Full misses land here, attributed to no single tier.
    total: TierMetrics,
}

/// Orchestrator-side metrics recorder.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    inner: Mutex<RecorderInner>,
}

impl Recorder {
    pub(crate) fn record_hit(&self, tier: Tier, elapsed_ms: u64) {
        let mut inner = self.inner.lock();
        let metrics = match tier {
            Tier::Memory => &mut inner.memory,
            Tier::Remote => &mut inner.remote,
            Tier::Persistent => &mut inner.persistent,
        };
        metrics.record(true, elapsed_ms);
    }

    pub(crate) fn record_full_miss(&self, elapsed_ms: u64) {
        self.inner.lock().total.record(false, elapsed_ms);
    }

    pub(crate) fn add_evictions(&self, tier: Tier, count: u64) {
        let mut inner = self.inner.lock();
        let metrics = match tier {
            Tier::Memory => &mut inner.memory,
            Tier::Remote => &mut inner.remote,
            Tier::Persistent => &mut inner.persistent,
        };
        metrics.evictions += count;
    }

    pub(crate) fn update_size(&self, tier: Tier, current: u64) {
        let mut inner = self.inner.lock();
        let metrics = match tier {
            Tier::Memory => &mut inner.memory,
            Tier::Remote => &mut inner.remote,
            Tier::Persistent => &mut inner.persistent,
        };
        metrics.update_size(current);
    }

    /// Assemble the report. `memory_evictions` comes from the entry store's
    /// own counters, which also see evictions triggered inside inserts.
    pub(crate) fn report(&self, memory_evictions: u64, memory_size: u64) -> MetricsReport {
        let mut inner = self.inner.lock();
        inner.memory.update_size(memory_size);
        inner.memory.evictions = memory_evictions;

        let memory = inner.memory.clone();
        let remote = inner.remote.clone();
        let persistent = inner.persistent.clone();

        let aggregate = TierMetrics {
            hits: memory.hits + remote.hits + persistent.hits,
            misses: memory.misses + remote.misses + persistent.misses + inner.total.misses,
            evictions: memory.evictions + remote.evictions + persistent.evictions,
            avg_response_time_ms: (memory.avg_response_time_ms
                + remote.avg_response_time_ms
                + persistent.avg_response_time_ms)
                / 3.0,
            current_size: memory.current_size + remote.current_size + persistent.current_size,
            peak_size: memory.peak_size + remote.peak_size + persistent.peak_size,
        };

        MetricsReport {
            memory,
            remote,
            persistent,
            aggregate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_sums_and_mean() {
        let recorder = Recorder::default();
        recorder.record_hit(Tier::Memory, 2);
        recorder.record_hit(Tier::Memory, 4);
        recorder.record_hit(Tier::Remote, 9);
        recorder.record_full_miss(30);
        recorder.add_evictions(Tier::Persistent, 5);

        let report = recorder.report(7, 2);

        assert_eq!(report.memory.hits, 2);
        assert!((report.memory.avg_response_time_ms - 3.0).abs() < f64::EPSILON);
        assert_eq!(report.remote.hits, 1);
        assert_eq!(report.aggregate.hits, 3);
        assert_eq!(report.aggregate.misses, 1);
        assert_eq!(report.aggregate.evictions, 12);
        assert_eq!(report.aggregate.current_size, 2);
        assert!((report.aggregate.avg_response_time_ms - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_peak_size_tracks_high_water_mark() {
        let recorder = Recorder::default();
        recorder.update_size(Tier::Memory, 10);
        recorder.update_size(Tier::Memory, 3);
        let report = recorder.report(0, 3);
        assert_eq!(report.memory.current_size, 3);
        assert_eq!(report.memory.peak_size, 10);
    }
}
