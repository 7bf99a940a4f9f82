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

use crate::eviction::Eviction;

/// Least-recently-used: the victim is the entry with the smallest
/// `metadata.last_used`.
#[derive(Debug)]
pub struct Lru;

impl Eviction for Lru {
    fn victim(&mut self, entries: &[CacheEntry]) -> Option<usize> {
        entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.metadata().last_used)
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::test_utils::entry;

    #[test]
    fn test_lru_picks_oldest_access() {
        let entries = vec![
            entry("a", 0, 1, 300),
            entry("b", 0, 1, 100),
            entry("c", 0, 1, 200),
        ];
        assert_eq!(Lru.victim(&entries), Some(1));
    }

    #[test]
    fn test_lru_empty() {
        assert_eq!(Lru.victim(&[]), None);
    }
}
