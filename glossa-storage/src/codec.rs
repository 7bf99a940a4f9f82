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

//! Binary batch file layout (little-endian, no padding):
//!
//! ```text
//! u32 magic = 0x54434C42 ("TCLB")
//! u32 version = 1
//! u32 entry_count
//! repeated entry_count times:
//!   u32 key_len
//!   u32 value_len
//!   bytes key_len
//!   bytes value_len
//!   u64 timestamp_ms
//!   u32 ttl_ms
//!   u32 flags
//! ```
//!
//! Entries are self-describing, so no separator is needed. The TTL field is
//! 32 bits on disk; wider in-memory values are clamped on write.

use bytes::{Buf, BufMut, BytesMut};
use glossa_common::{
    entry::CacheEntry,
    error::{Error, ErrorKind, Result},
};

pub(crate) const BATCH_MAGIC: u32 = 0x5443_4C42;
pub(crate) const BATCH_VERSION: u32 = 1;

pub(crate) fn encode_batch(entries: &[CacheEntry]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32_le(BATCH_MAGIC);
    buf.put_u32_le(BATCH_VERSION);
    buf.put_u32_le(entries.len() as u32);

    for entry in entries {
        let key = entry.key().as_bytes();
        let value = entry.translation().as_bytes();
        buf.put_u32_le(key.len() as u32);
        buf.put_u32_le(value.len() as u32);
        buf.put_slice(key);
        buf.put_slice(value);
        buf.put_u64_le(entry.timestamp());
        buf.put_u32_le(entry.ttl().min(u32::MAX as u64) as u32);
        buf.put_u32_le(entry.flags());
    }

    buf.freeze().to_vec()
}

/// Decode up to `count` entries after skipping `offset`, returning the
/// decoded entries and the total entry count recorded in the header.
pub(crate) fn decode_batch(mut buf: &[u8], offset: usize, count: usize) -> Result<(Vec<CacheEntry>, usize)> {
    if buf.remaining() < 12 {
        return Err(truncated("header"));
    }

    let magic = buf.get_u32_le();
    if magic != BATCH_MAGIC {
        return Err(Error::new(ErrorKind::InvalidFormat, "bad batch magic")
            .with_context("expected", format!("{BATCH_MAGIC:#x}"))
            .with_context("got", format!("{magic:#x}")));
    }
    let version = buf.get_u32_le();
    if version != BATCH_VERSION {
        return Err(Error::new(ErrorKind::InvalidFormat, "unsupported batch version").with_context("version", version));
    }
    let total = buf.get_u32_le() as usize;

    let mut entries = Vec::new();
    for i in 0..total {
        if i >= offset.saturating_add(count) {
            break;
        }

        if buf.remaining() < 8 {
            return Err(truncated("entry lengths"));
        }
        let key_len = buf.get_u32_le() as usize;
        let value_len = buf.get_u32_le() as usize;
        if buf.remaining() < key_len + value_len + 16 {
            return Err(truncated("entry body"));
        }

        if i < offset {
            buf.advance(key_len + value_len + 16);
            continue;
        }

        let key = std::str::from_utf8(&buf[..key_len])
            .map_err(|e| Error::new(ErrorKind::InvalidFormat, "batch key is not valid utf-8").with_source(e))?
            .to_string();
        buf.advance(key_len);
        let value = std::str::from_utf8(&buf[..value_len])
            .map_err(|e| Error::new(ErrorKind::InvalidFormat, "batch value is not valid utf-8").with_source(e))?
            .to_string();
        buf.advance(value_len);

        let timestamp = buf.get_u64_le();
        let ttl = buf.get_u32_le() as u64;
        let flags = buf.get_u32_le();

        entries.push(CacheEntry::from_persisted(key, value, timestamp, ttl, flags));
    }

    Ok((entries, total))
}

fn truncated(section: &'static str) -> Error {
    Error::new(ErrorKind::InvalidFormat, "batch file is truncated").with_context("section", section)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: &str, timestamp: u64, ttl: u64, flags: u32) -> CacheEntry {
        CacheEntry::from_persisted(key, value, timestamp, ttl, flags)
    }

    #[test]
    fn test_batch_round_trip_is_byte_exact() {
        let entries = vec![
            entry("en:fr:00c0ffee", "bonjour", 1_000, 60_000, 0),
            entry("en:de:00c0ffee", "hallo", 2_000, 120_000, 7),
        ];

        let encoded = encode_batch(&entries);
        let (decoded, total) = decode_batch(&encoded, 0, usize::MAX).unwrap();

        assert_eq!(total, 2);
        assert_eq!(decoded, entries);
    }

    #[test]
    fn test_offset_and_count_paging() {
        let entries: Vec<_> = (0..5)
            .map(|i| entry(&format!("k{i}"), &format!("v{i}"), i, 1_000, 0))
            .collect();
        let encoded = encode_batch(&entries);

        let (page, total) = decode_batch(&encoded, 2, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page, entries[2..4]);

        let (past_end, _) = decode_batch(&encoded, 5, 2).unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_bad_magic_is_invalid_format() {
        let mut encoded = encode_batch(&[entry("k", "v", 0, 1, 0)]);
        encoded[0] ^= 0xFF;
        let err = decode_batch(&encoded, 0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_bad_version_is_invalid_format() {
        let mut encoded = encode_batch(&[entry("k", "v", 0, 1, 0)]);
        encoded[4] = 99;
        let err = decode_batch(&encoded, 0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_truncated_file_is_invalid_format() {
        let encoded = encode_batch(&[entry("key", "value", 0, 1, 0)]);
        let err = decode_batch(&encoded[..encoded.len() - 4], 0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_empty_batch() {
        let encoded = encode_batch(&[]);
        let (decoded, total) = decode_batch(&encoded, 0, usize::MAX).unwrap();
        assert_eq!(total, 0);
        assert!(decoded.is_empty());
    }
}
