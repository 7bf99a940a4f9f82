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

use glossa_common::{entry::CacheEntry, error::Result};

/// Encode an entry into the payload stored by the remote service.
pub fn encode_entry(entry: &CacheEntry) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(entry)?)
}

/// Decode a payload read back from the remote service.
pub fn decode_entry(bytes: &[u8]) -> Result<CacheEntry> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use glossa_common::error::ErrorKind;

    use super::*;

    #[test]
    fn test_entry_payload_round_trip() {
        let mut entry = CacheEntry::new("en:fr:cafebabe", "hello", "en", "fr", "bonjour")
            .with_ttl(5_000)
            .with_confidence(0.87)
            .with_context("greeting");
        entry.set_timestamp(123);
        entry.touch(456);

        let decoded = decode_entry(&encode_entry(&entry).unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_garbage_fails_with_invalid_format() {
        let err = decode_entry(b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }
}
