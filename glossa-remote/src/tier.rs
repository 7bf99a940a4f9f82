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

use std::sync::atomic::AtomicU32;

use glossa_common::{
    clock::ClockRef,
    entry::CacheEntry,
    error::{Error, ErrorKind, Result},
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    codec::{decode_entry, encode_entry},
    command::{Command, Reply},
    connection::Connector,
    pool::{ConnectionPool, PoolStats},
    schema::SchemaConfig,
};

/// Remote tier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Service host name.
    pub host: String,
    /// Service port.
    pub port: u16,
    /// Optional credential, authenticated once per connection at pool fill.
    pub credential: Option<String>,
    /// Budget for every blocking step: connect, checkout, and each command.
    pub timeout_ms: u64,
    /// Fixed connection pool size.
    pub pool_size: usize,
    /// Namespace prefix prepended to every key sent to the service.
    pub key_prefix: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            credential: None,
            timeout_ms: 1_000,
            pool_size: 5,
            key_prefix: "glossa:".to_string(),
        }
    }
}

/// Remote key-value tier.
///
/// Per-entry get/set/delete/exists against an external service, with TTL
/// expiry handled natively by the service. The adapter never retries
/// internally; retry policy belongs to the caller.
pub struct RemoteTier<C>
where
    C: Connector + Clone,
{
    pub(crate) connector: C,
    pub(crate) config: RemoteConfig,
    pub(crate) schema: SchemaConfig,
    pub(crate) clock: ClockRef,
    pub(crate) pool: RwLock<ConnectionPool<C>>,
    pub(crate) schema_version: AtomicU32,
}

impl<C> RemoteTier<C>
where
    C: Connector + Clone,
{
    /// Establish the tier: fill the connection pool, push the persistence
    /// configuration to the service, and run any pending schema migration.
    pub async fn connect(connector: C, config: RemoteConfig, schema: SchemaConfig, clock: ClockRef) -> Result<Self> {
        let pool = ConnectionPool::connect(connector.clone(), config.clone(), clock.clone()).await?;
        let tier = Self {
            connector,
            config,
            schema,
            clock,
            pool: RwLock::new(pool),
            schema_version: AtomicU32::new(0),
        };
        tier.configure_persistence().await?;
        tier.migrate().await?;
        Ok(tier)
    }

    pub(crate) fn remote_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    pub(crate) fn meta_key(&self, name: &str) -> String {
        format!("{}meta:{}", self.config.key_prefix, name)
    }

    pub(crate) async fn execute(&self, command: Command) -> Result<Reply> {
        self.pool.read().await.execute(command).await
    }

    /// Read the entry stored under `key`, if the service still holds it.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let reply = self
            .execute(Command::Get {
                key: self.remote_key(key),
            })
            .await?;
        match reply {
            Reply::Nil => Ok(None),
            Reply::Data(bytes) => Ok(Some(decode_entry(&bytes)?)),
            other => Err(unexpected_reply("GET", other)),
        }
    }

    /// Upsert an entry. The TTL travels as whole seconds (integer division;
    /// sub-second precision is lost) and expiry is enforced by the service.
    pub async fn set(&self, entry: &CacheEntry) -> Result<()> {
        let payload = encode_entry(entry)?;
        let reply = self
            .execute(Command::SetEx {
                key: self.remote_key(entry.key()),
                ttl_secs: entry.ttl() / 1_000,
                value: payload,
            })
            .await?;
        match reply {
            Reply::Ok => Ok(()),
            other => Err(unexpected_reply("SETEX", other)),
        }
    }

    /// Update is an upsert for this tier: the write overwrites in place.
    pub async fn update(&self, entry: &CacheEntry) -> Result<()> {
        self.set(entry).await
    }

    /// Delete `key`. Deleting an absent key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let reply = self
            .execute(Command::Del {
                key: self.remote_key(key),
            })
            .await?;
        match reply {
            Reply::Ok | Reply::Nil | Reply::Integer(_) => Ok(()),
            other => Err(unexpected_reply("DEL", other)),
        }
    }

    /// Whether `key` currently exists on the service.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let reply = self
            .execute(Command::Exists {
                key: self.remote_key(key),
            })
            .await?;
        match reply {
            Reply::Integer(n) => Ok(n > 0),
            Reply::Nil => Ok(false),
            other => Err(unexpected_reply("EXISTS", other)),
        }
    }

    /// Liveness probe.
    pub async fn ping(&self) -> Result<()> {
        let reply = self.execute(Command::Ping).await?;
        match reply {
            Reply::Ok | Reply::Data(_) => Ok(()),
            other => Err(unexpected_reply("PING", other)),
        }
    }

    /// Drop every key in this tier's namespace.
    pub async fn flush_all(&self) -> Result<()> {
        let reply = self
            .execute(Command::FlushPrefix {
                prefix: self.config.key_prefix.clone(),
            })
            .await?;
        match reply {
            Reply::Ok | Reply::Integer(_) => Ok(()),
            other => Err(unexpected_reply("FLUSH", other)),
        }
    }

    /// TTL expiry is service-managed for this tier, so the sweep has nothing
    /// to do. Kept so the orchestrator can fan expiry out uniformly.
    pub fn evict_expired(&self) -> usize {
        0
    }

    /// Whether service-side persistence, and thus backup/restore, is enabled.
    pub fn snapshot_enabled(&self) -> bool {
        self.schema.enabled
    }

    /// Pool counter snapshot.
    pub async fn stats(&self) -> PoolStats {
        self.pool.read().await.stats()
    }

    /// Tear down the connection pool.
    pub async fn close(&self) {
        self.pool.read().await.close().await;
    }
}

pub(crate) fn unexpected_reply(command: &'static str, reply: Reply) -> Error {
    match reply {
        Reply::Error(message) => {
            Error::new(ErrorKind::Remote, "service rejected command").with_context("service", message)
        }
        other => Error::new(ErrorKind::Remote, "unexpected reply")
            .with_context("command", command)
            .with_context("reply", format!("{other:?}")),
    }
}
