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

/// First-in-first-out: the victim is the entry with the smallest insertion
/// `timestamp`, regardless of how recently it was read.
#[derive(Debug)]
pub struct Fifo;

impl Eviction for Fifo {
    fn victim(&mut self, entries: &[CacheEntry]) -> Option<usize> {
        entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.timestamp())
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::test_utils::entry;

    #[test]
    fn test_fifo_ignores_access_recency() {
        let entries = vec![
            entry("a", 200, 1, 0),
            // Oldest insert but most recently read; still the victim.
            entry("b", 50, 1, 9_999),
            entry("c", 100, 1, 0),
        ];
        assert_eq!(Fifo.victim(&entries), Some(1));
    }
}
