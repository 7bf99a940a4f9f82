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

//! glossa - tiered translation cache for Rust.
//!
//! glossa caches computed translations across three tiers: a bounded
//! in-memory store with pluggable eviction, a remote key-value service with
//! native TTL expiry, and immutable on-disk batch snapshots. Lookups descend
//! the tiers and promote hits upward; writes land in memory first and fan
//! out best-effort.
//!
//! ```rust,ignore
//! use glossa::prelude::*;
//!
//! let cache = TieredCacheBuilder::new(connector).build().await?;
//! let entry = cache.entry("Hello World", "en", "fr", "Bonjour le monde")?;
//! cache.insert(entry).await?;
//!
//! if let Some(hit) = cache.lookup("Hello World", "en", "fr").await? {
//!     println!("{}", hit.translation());
//! }
//! ```

mod builder;
mod cache;
mod metrics;

/// Convenient re-exports of the commonly used types.
pub mod prelude;

pub use builder::TieredCacheBuilder;
pub use cache::TieredCache;
pub use glossa_common::{
    clock::{Clock, ClockRef, MockClock, SystemClock},
    entry::{CacheEntry, EntryMetadata},
    error::{Error, ErrorKind, Result},
    key::{HashMethod, KeyConfig, KeyGenerator},
};
pub use glossa_memory::{eviction::EvictionConfig, CacheStats, EntryStore, EntryStoreConfig};
pub use glossa_remote::{Connection, Connector, PoolStats, RemoteConfig, RemoteTier, SchemaConfig};
pub use glossa_storage::{BatchStore, StorageConfig, StorageStats};
pub use metrics::{MetricsReport, Tier, TierMetrics};
