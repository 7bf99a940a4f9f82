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

use std::fmt::Debug;

use glossa_common::entry::CacheEntry;
use serde::{Deserialize, Serialize};

pub mod fifo;
pub mod lfu;
pub mod lru;
pub mod random;

/// Victim selection over the live entry set.
///
/// The store removes victims with swap-remove, so entry order carries no
/// meaning; a policy must derive its choice from entry fields alone.
pub trait Eviction: Send + Sync + 'static + Debug {
    /// Pick the index of the next victim, or `None` when the set is empty.
    fn victim(&mut self, entries: &[CacheEntry]) -> Option<usize>;
}

/// Eviction policy selection for the entry store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvictionConfig {
    /// Evict the entry with the oldest last access.
    #[default]
    Lru,
    /// Evict the entry with the fewest hits.
    Lfu,
    /// Evict the entry with the oldest insertion time.
    Fifo,
    /// Evict a uniformly random entry. The RNG is seeded once when the store
    /// is built, keeping eviction order reproducible for a given seed.
    Random {
        /// RNG seed.
        seed: u64,
    },
}

impl EvictionConfig {
    /// Instantiate the configured policy.
    pub fn build(&self) -> Box<dyn Eviction> {
        match self {
            Self::Lru => Box::new(lru::Lru),
            Self::Lfu => Box::new(lfu::Lfu),
            Self::Fifo => Box::new(fifo::Fifo),
            Self::Random { seed } => Box::new(random::Random::new(*seed)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    pub fn entry(key: &str, timestamp: u64, usage_count: u32, last_used: u64) -> CacheEntry {
        let mut e = CacheEntry::new(key, key, "en", "fr", "x").with_ttl(60_000);
        e.set_timestamp(timestamp);
        for _ in 0..usage_count {
            e.touch(last_used);
        }
        e
    }
}
