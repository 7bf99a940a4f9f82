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

/// Least-frequently-used: the victim is the entry with the smallest
/// `metadata.usage_count`.
#[derive(Debug)]
pub struct Lfu;

impl Eviction for Lfu {
    fn victim(&mut self, entries: &[CacheEntry]) -> Option<usize> {
        entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.metadata().usage_count)
            .map(|(i, _)| i)
    }
}
