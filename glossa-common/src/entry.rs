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

/// Per-entry bookkeeping used by the LRU/LFU eviction policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Number of cache hits served by this entry.
    pub usage_count: u32,
    /// Clock reading of the most recent hit.
    pub last_used: u64,
    /// Optional free-form context attached by the producer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// The canonical cached unit: one translation result plus its validity window
/// and usage bookkeeping.
///
/// `key`, `source_text`, `source_lang`, and `target_lang` are fixed at
/// construction; the translation, validity window, and metadata may change
/// over the entry's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    key: String,
    source_text: String,
    source_lang: String,
    target_lang: String,
    translation: String,
    timestamp: u64,
    ttl: u64,
    flags: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    metadata: EntryMetadata,
}

impl CacheEntry {
    /// Create an entry for a freshly computed translation.
    ///
    /// `timestamp` and usage metadata are stamped by the store on insert; a
    /// TTL of zero means "use the store default".
    pub fn new(
        key: impl Into<String>,
        source_text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source_text: source_text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            translation: translation.into(),
            timestamp: 0,
            ttl: 0,
            flags: 0,
            confidence: None,
            metadata: EntryMetadata::default(),
        }
    }

    /// Reconstruct an entry from its persisted fields.
    ///
    /// The batch file format stores only key, value, timestamp, TTL and
    /// flags; the request-side fields come back empty.
    pub fn from_persisted(key: impl Into<String>, value: impl Into<String>, timestamp: u64, ttl: u64, flags: u32) -> Self {
        Self {
            key: key.into(),
            source_text: String::new(),
            source_lang: String::new(),
            target_lang: String::new(),
            translation: value.into(),
            timestamp,
            ttl,
            flags,
            confidence: None,
            metadata: EntryMetadata::default(),
        }
    }

    /// Set the validity window.
    pub fn with_ttl(mut self, ttl_ms: u64) -> Self {
        self.ttl = ttl_ms;
        self
    }

    /// Set the quality score.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach producer context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.metadata.context = Some(context.into());
        self
    }

    /// Set the entry flags.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// The cache key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The source text this entry was computed from.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Source language code.
    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    /// Target language code.
    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// The cached translation.
    pub fn translation(&self) -> &str {
        &self.translation
    }

    /// Creation time in clock milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Validity window in milliseconds.
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Entry flags as persisted.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Optional quality score.
    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    /// Usage bookkeeping.
    pub fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }

    /// Replace the cached translation.
    pub fn set_translation(&mut self, translation: impl Into<String>) {
        self.translation = translation.into();
    }

    /// Replace the validity window.
    pub fn set_ttl(&mut self, ttl_ms: u64) {
        self.ttl = ttl_ms;
    }

    /// Restamp the creation time.
    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Grow the validity window, saturating instead of overflowing.
    pub fn extend_ttl(&mut self, extension_ms: u64) {
        self.ttl = self.ttl.saturating_add(extension_ms);
    }

    /// An entry is expired strictly after its window: `now - timestamp > ttl`.
    /// At exactly `timestamp + ttl` it is still valid.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) > self.ttl
    }

    /// Record a hit: bump the usage count and refresh the last-used stamp.
    pub fn touch(&mut self, now_ms: u64) {
        self.metadata.usage_count = self.metadata.usage_count.saturating_add(1);
        self.metadata.last_used = now_ms;
    }

    /// Stamp the entry as freshly inserted.
    pub fn stamp_inserted(&mut self, now_ms: u64, default_ttl_ms: u64) {
        self.timestamp = now_ms;
        if self.ttl == 0 {
            self.ttl = default_ttl_ms;
        }
        self.metadata.usage_count = 1;
        self.metadata.last_used = now_ms;
    }

    /// Copy the mutable fields from `src`, leaving the identity fields alone.
    pub fn apply_update(&mut self, src: &CacheEntry) {
        self.translation = src.translation.clone();
        self.timestamp = src.timestamp;
        self.ttl = src.ttl;
        self.flags = src.flags;
        self.confidence = src.confidence;
        self.metadata = src.metadata.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CacheEntry {
        CacheEntry::new("en:fr:deadbeef", "hello", "en", "fr", "bonjour").with_ttl(1_000)
    }

    #[test]
    fn test_expiry_boundary() {
        let mut e = entry();
        e.set_timestamp(5_000);
        // Exactly at timestamp + ttl the entry is still valid.
        assert!(!e.is_expired(6_000));
        assert!(e.is_expired(6_001));
        // A clock reading before the timestamp never expires the entry.
        assert!(!e.is_expired(0));
    }

    #[test]
    fn test_touch() {
        let mut e = entry();
        e.stamp_inserted(100, 9_999);
        assert_eq!(e.metadata().usage_count, 1);
        e.touch(250);
        assert_eq!(e.metadata().usage_count, 2);
        assert_eq!(e.metadata().last_used, 250);
    }

    #[test]
    fn test_default_ttl_applies_only_when_unset() {
        let mut unset = CacheEntry::new("k", "s", "en", "fr", "v");
        unset.stamp_inserted(0, 7_777);
        assert_eq!(unset.ttl(), 7_777);

        let mut set = entry();
        set.stamp_inserted(0, 7_777);
        assert_eq!(set.ttl(), 1_000);
    }

    #[test]
    fn test_extend_ttl_saturates() {
        let mut e = entry();
        e.extend_ttl(u64::MAX);
        assert_eq!(e.ttl(), u64::MAX);
    }

    #[test]
    fn test_apply_update_preserves_identity() {
        let mut e = entry();
        let mut patch = CacheEntry::new("other-key", "other", "de", "it", "ciao").with_ttl(5);
        patch.set_timestamp(42);
        e.apply_update(&patch);
        assert_eq!(e.key(), "en:fr:deadbeef");
        assert_eq!(e.source_lang(), "en");
        assert_eq!(e.translation(), "ciao");
        assert_eq!(e.ttl(), 5);
        assert_eq!(e.timestamp(), 42);
    }
}
