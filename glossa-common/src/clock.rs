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
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

/// Millisecond clock consumed by every cache tier.
///
/// Entry timestamps, TTL checks, batch file names, and connection bookkeeping
/// all read the same clock, so one consistent source must be shared across a
/// cache instance.
pub trait Clock: Send + Sync + 'static + Debug {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u64;
}

/// Shared handle to a [`Clock`].
pub type ClockRef = Arc<dyn Clock>;

/// Default clock backed by the system time.
///
/// Millisecond values are taken since the Unix epoch so that batch file names
/// and persisted entry timestamps stay comparable across process restarts.
/// Callers that require a strictly monotonic source can supply their own
/// [`Clock`] implementation instead.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually driven clock for tests.
#[derive(Debug, Default)]
pub struct MockClock {
    now: AtomicU64,
}

impl MockClock {
    /// Create a mock clock starting at `now` milliseconds.
    pub fn with_now(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Advance the clock by `delta` milliseconds.
    pub fn advance(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::Relaxed);
    }

    /// Pin the clock to an absolute value.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::Relaxed);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}
