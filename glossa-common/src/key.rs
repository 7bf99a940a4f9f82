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

use crate::{
    clock::ClockRef,
    error::{Error, ErrorKind, Result},
};

const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// Hash algorithm used for the text component of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashMethod {
    /// 32-bit FNV-1a.
    #[default]
    Fnv1a,
    /// MurmurHash3. Selectable but not implemented.
    Murmur3,
    /// Caller-provided algorithm. Selectable but not implemented.
    Custom,
}

/// Key derivation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Hash algorithm for the source text.
    pub method: HashMethod,
    /// Strip whitespace and lowercase the source text before hashing.
    pub normalize: bool,
    /// Append the current clock reading to the key, making it unique per call.
    pub include_timestamp: bool,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            method: HashMethod::Fnv1a,
            normalize: true,
            include_timestamp: false,
        }
    }
}

/// Derives deterministic cache keys from `(source text, source language,
/// target language)`.
///
/// The key format is `"{source_lang}:{target_lang}:{hash:08x}"`, with
/// `":{timestamp}"` appended when configured. Two calls with identical inputs
/// and `include_timestamp` off always produce identical keys.
#[derive(Debug)]
pub struct KeyGenerator {
    config: KeyConfig,
    clock: ClockRef,
}

impl KeyGenerator {
    /// Create a key generator.
    pub fn new(config: KeyConfig, clock: ClockRef) -> Self {
        tracing::debug!(method = ?config.method, normalize = config.normalize, "key generator created");
        Self { config, clock }
    }

    /// Current hash method.
    pub fn method(&self) -> HashMethod {
        self.config.method
    }

    /// Switch the hash method at runtime.
    pub fn set_method(&mut self, method: HashMethod) {
        self.config.method = method;
    }

    /// Derive the cache key for a translation request.
    ///
    /// Fails with [`ErrorKind::InvalidParam`] when any argument is empty and
    /// with [`ErrorKind::NotImplemented`] for unimplemented hash methods.
    pub fn generate(&self, source_text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        if source_text.is_empty() || source_lang.is_empty() || target_lang.is_empty() {
            return Err(Error::new(ErrorKind::InvalidParam, "key components must be non-empty")
                .with_context("source_lang", source_lang)
                .with_context("target_lang", target_lang));
        }

        let hash = match self.config.method {
            HashMethod::Fnv1a => {
                if self.config.normalize {
                    fnv1a_32(&normalize(source_text))
                } else {
                    fnv1a_32(source_text.as_bytes())
                }
            }
            HashMethod::Murmur3 | HashMethod::Custom => {
                return Err(Error::new(ErrorKind::NotImplemented, "hash method not implemented")
                    .with_context("method", format!("{:?}", self.config.method)));
            }
        };

        let key = if self.config.include_timestamp {
            format!("{source_lang}:{target_lang}:{hash:08x}:{}", self.clock.now_ms())
        } else {
            format!("{source_lang}:{target_lang}:{hash:08x}")
        };

        Ok(key)
    }
}

/// Byte-wise, locale-naive normalization: drop ASCII whitespace, lowercase
/// ASCII letters, pass all other bytes through untouched.
fn normalize(text: &str) -> Vec<u8> {
    text.bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| b.to_ascii_lowercase())
        .collect()
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::MockClock;

    fn generator(config: KeyConfig) -> KeyGenerator {
        KeyGenerator::new(config, Arc::new(MockClock::with_now(1_000)))
    }

    #[test]
    fn test_key_deterministic() {
        let gen = generator(KeyConfig::default());
        let a = gen.generate("Hello World", "en", "fr").unwrap();
        let b = gen.generate("Hello World", "en", "fr").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_normalization_invariance() {
        let gen = generator(KeyConfig::default());
        let spaced = gen.generate("Hello World", "en", "fr").unwrap();
        let squashed = gen.generate("helloworld", "en", "fr").unwrap();
        assert_eq!(spaced, squashed);
    }

    #[test]
    fn test_key_without_normalization_differs() {
        let gen = generator(KeyConfig {
            normalize: false,
            ..Default::default()
        });
        let spaced = gen.generate("Hello World", "en", "fr").unwrap();
        let squashed = gen.generate("helloworld", "en", "fr").unwrap();
        assert_ne!(spaced, squashed);
    }

    #[test]
    fn test_key_shape() {
        let gen = generator(KeyConfig::default());
        let key = gen.generate("bonjour", "fr", "en").unwrap();
        let parts: Vec<_> = key.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "fr");
        assert_eq!(parts[1], "en");
        assert_eq!(parts[2].len(), 8);
        assert!(u32::from_str_radix(parts[2], 16).is_ok());
    }

    #[test]
    fn test_key_with_timestamp() {
        let gen = generator(KeyConfig {
            include_timestamp: true,
            ..Default::default()
        });
        let key = gen.generate("bonjour", "fr", "en").unwrap();
        assert!(key.ends_with(":1000"));
    }

    #[test]
    fn test_empty_components_rejected() {
        let gen = generator(KeyConfig::default());
        for (text, src, dst) in [("", "en", "fr"), ("hi", "", "fr"), ("hi", "en", "")] {
            let err = gen.generate(text, src, dst).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParam);
        }
    }

    #[test]
    fn test_unimplemented_methods() {
        for method in [HashMethod::Murmur3, HashMethod::Custom] {
            let gen = generator(KeyConfig {
                method,
                ..Default::default()
            });
            let err = gen.generate("hi", "en", "fr").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotImplemented);
        }
    }

    #[test]
    fn test_fnv1a_reference_values() {
        // Published FNV-1a 32-bit test vectors.
        assert_eq!(fnv1a_32(b""), 0x811c9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9cf968);
    }
}
