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

use glossa_common::entry::CacheEntry;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::eviction::Eviction;

/// Uniformly random victim selection.
///
/// The RNG is seeded exactly once, at construction. Reseeding per eviction
/// call would make eviction order depend on wall time and untestable.
#[derive(Debug)]
pub struct Random {
    rng: SmallRng,
}

impl Random {
    /// Create the policy with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Eviction for Random {
    fn victim(&mut self, entries: &[CacheEntry]) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }
        Some(self.rng.random_range(0..entries.len()))
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::eviction::test_utils::entry;

    #[test]
    fn test_random_in_bounds() {
        let entries = (0..16).map(|i| entry(&format!("k{i}"), 0, 1, 0)).collect_vec();
        let mut policy = Random::new(7);
        for _ in 0..64 {
            let victim = policy.victim(&entries).unwrap();
            assert!(victim < entries.len());
        }
    }

    #[test]
    fn test_random_reproducible_per_seed() {
        let entries = (0..16).map(|i| entry(&format!("k{i}"), 0, 1, 0)).collect_vec();
        let mut a = Random::new(42);
        let mut b = Random::new(42);
        let va = (0..32).map(|_| a.victim(&entries).unwrap()).collect_vec();
        let vb = (0..32).map(|_| b.victim(&entries).unwrap()).collect_vec();
        assert_eq!(va, vb);
    }

    #[test]
    fn test_random_empty() {
        assert_eq!(Random::new(0).victim(&[]), None);
    }
}
