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

use std::sync::Arc;

use glossa_common::{
    clock::{ClockRef, SystemClock},
    error::{Error, ErrorKind, Result},
    key::{KeyConfig, KeyGenerator},
};
use glossa_memory::{EntryStore, EntryStoreConfig};
use glossa_remote::{Connector, RemoteConfig, RemoteTier, SchemaConfig};
use glossa_storage::{BatchStore, StorageConfig};

use crate::{cache::TieredCache, metrics::Recorder};

/// Builder for a [`TieredCache`].
///
/// Every section has working defaults; only the connector is mandatory.
pub struct TieredCacheBuilder<C>
where
    C: Connector + Clone,
{
    connector: C,
    key: KeyConfig,
    memory: EntryStoreConfig,
    remote: RemoteConfig,
    schema: SchemaConfig,
    storage: StorageConfig,
    clock: Option<ClockRef>,
}

impl<C> TieredCacheBuilder<C>
where
    C: Connector + Clone,
{
    /// Start a builder with the connector that reaches the remote service.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            key: KeyConfig::default(),
            memory: EntryStoreConfig::default(),
            remote: RemoteConfig::default(),
            schema: SchemaConfig::default(),
            storage: StorageConfig::default(),
            clock: None,
        }
    }

    /// Set the key derivation configuration.
    pub fn with_key_config(mut self, key: KeyConfig) -> Self {
        self.key = key;
        self
    }

    /// Set the memory tier configuration.
    pub fn with_memory(mut self, memory: EntryStoreConfig) -> Self {
        self.memory = memory;
        self
    }

    /// Set the remote tier configuration.
    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = remote;
        self
    }

    /// Set the remote tier's schema and snapshot configuration.
    pub fn with_schema(mut self, schema: SchemaConfig) -> Self {
        self.schema = schema;
        self
    }

    /// Set the persistent tier configuration.
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Share a clock across all tiers. Defaults to the system clock.
    pub fn with_clock(mut self, clock: ClockRef) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the cache: allocate the entry store, fill the remote pool, and
    /// open the storage directory.
    pub async fn build(self) -> Result<TieredCache<C>> {
        // A memory snapshot must fit in a single batch file, or persistence
        // would silently drop entries.
        if self.memory.max_entries > self.storage.max_batch_size {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "memory max_entries must not exceed storage max_batch_size",
            )
            .with_context("max_entries", self.memory.max_entries)
            .with_context("max_batch_size", self.storage.max_batch_size));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock) as ClockRef);

        let keygen = KeyGenerator::new(self.key, clock.clone());
        let memory = EntryStore::new(self.memory, clock.clone())?;
        let remote = RemoteTier::connect(self.connector, self.remote, self.schema, clock.clone()).await?;
        let storage = BatchStore::open(self.storage, clock.clone()).await?;

        Ok(TieredCache {
            keygen: Arc::new(keygen),
            memory: Arc::new(memory),
            remote: Arc::new(remote),
            storage: Arc::new(storage),
            clock,
            metrics: Arc::new(Recorder::default()),
        })
    }
}
