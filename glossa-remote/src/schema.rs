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

//! Schema versioning and snapshot management for the remote tier.
//!
//! The schema version lives under `<prefix>meta:version` on the service.
//! Migrations apply linearly from the persisted version up to
//! [`SCHEMA_VERSION`]; each step is one idempotent write, so an interrupted
//! migration resumes safely on the next startup.

use std::{path::Path, sync::atomic::Ordering};

use glossa_common::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

use crate::{
    command::{Command, Reply},
    connection::Connector,
    pool::ConnectionPool,
    tier::{unexpected_reply, RemoteTier},
};

/// Current schema version. Bump together with a new migration step.
pub const SCHEMA_VERSION: u32 = 1;

/// Snapshot and schema configuration for the remote tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Whether service-side persistence (and thus backup/restore) is enabled.
    pub enabled: bool,
    /// File the service writes its native snapshot to.
    pub snapshot_filename: String,
    /// Service-side snapshot interval, in seconds.
    pub save_interval_s: u32,
    /// Minimum changed keys before the service snapshots on its own.
    pub min_changes: u32,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snapshot_filename: "glossa.snapshot".to_string(),
            save_interval_s: 900,
            min_changes: 100,
        }
    }
}

impl<C> RemoteTier<C>
where
    C: Connector + Clone,
{
    /// Push the snapshot parameters to the service. Called once at connect.
    pub(crate) async fn configure_persistence(&self) -> Result<()> {
        if !self.schema.enabled {
            return Ok(());
        }

        for (parameter, value) in [
            (
                "save",
                format!("{} {}", self.schema.save_interval_s, self.schema.min_changes),
            ),
            ("dbfilename", self.schema.snapshot_filename.clone()),
        ] {
            let reply = self
                .execute(Command::ConfigSet {
                    parameter: parameter.to_string(),
                    value,
                })
                .await?;
            if !matches!(reply, Reply::Ok) {
                return Err(unexpected_reply("CONFIG SET", reply));
            }
        }
        Ok(())
    }

    /// Read the persisted schema version and apply any pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current = match self
            .execute(Command::Get {
                key: self.meta_key("version"),
            })
            .await?
        {
            Reply::Nil => 0,
            Reply::Data(bytes) => String::from_utf8_lossy(&bytes).trim().parse::<u32>().map_err(|e| {
                Error::new(ErrorKind::InvalidFormat, "persisted schema version is not a number").with_source(e)
            })?,
            other => return Err(unexpected_reply("GET", other)),
        };

        if current >= SCHEMA_VERSION {
            self.schema_version.store(current, Ordering::Relaxed);
            return Ok(());
        }

        tracing::info!(from = current, to = SCHEMA_VERSION, "migrating remote schema");

        if current < 1 {
            let reply = self
                .execute(Command::SAdd {
                    key: self.meta_key("schemas"),
                    member: "translation".to_string(),
                })
                .await?;
            if reply.is_error() {
                return Err(unexpected_reply("SADD", reply));
            }
        }

        let reply = self
            .execute(Command::Set {
                key: self.meta_key("version"),
                value: SCHEMA_VERSION.to_string().into_bytes(),
            })
            .await?;
        if !matches!(reply, Reply::Ok) {
            return Err(unexpected_reply("SET", reply));
        }

        self.schema_version.store(SCHEMA_VERSION, Ordering::Relaxed);
        Ok(())
    }

    /// Schema version observed at the last connect or migration.
    pub fn schema_version(&self) -> u32 {
        self.schema_version.load(Ordering::Relaxed)
    }

    /// Check that the schema meta keys exist on the service.
    pub async fn validate_schema(&self) -> Result<()> {
        for name in ["version", "schemas"] {
            let reply = self
                .execute(Command::Exists {
                    key: self.meta_key(name),
                })
                .await?;
            match reply {
                Reply::Integer(n) if n > 0 => {}
                Reply::Integer(_) | Reply::Nil => {
                    return Err(Error::new(ErrorKind::InvalidFormat, "schema meta key is missing")
                        .with_context("key", self.meta_key(name)));
                }
                other => return Err(unexpected_reply("EXISTS", other)),
            }
        }
        Ok(())
    }

    /// Snapshot the service natively, then copy the snapshot file to `path`.
    pub async fn backup(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.schema.enabled {
            return Err(Error::new(ErrorKind::InvalidParam, "service persistence is disabled"));
        }

        let reply = self.execute(Command::Save).await?;
        if !matches!(reply, Reply::Ok) {
            return Err(unexpected_reply("SAVE", reply));
        }

        tokio::fs::copy(&self.schema.snapshot_filename, path.as_ref()).await?;
        tracing::info!(path = %path.as_ref().display(), "remote tier backed up");
        Ok(())
    }

    /// Replace the service snapshot with `path` and re-establish the pool.
    ///
    /// The pool is torn down for the duration of the copy; a copy failure
    /// leaves the tier closed, and the caller may retry the restore.
    pub async fn restore(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.schema.enabled {
            return Err(Error::new(ErrorKind::InvalidParam, "service persistence is disabled"));
        }

        let mut pool = self.pool.write().await;
        pool.close().await;

        tokio::fs::copy(path.as_ref(), &self.schema.snapshot_filename).await?;

        *pool = ConnectionPool::connect(self.connector.clone(), self.config.clone(), self.clock.clone()).await?;
        tracing::info!(path = %path.as_ref().display(), "remote tier restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glossa_common::clock::{ClockRef, MockClock};

    use super::*;
    use crate::{
        test_utils::{MemoryRemote, MockConnector},
        RemoteConfig,
    };

    async fn tier_with(service: &MemoryRemote, schema: SchemaConfig) -> RemoteTier<MockConnector> {
        RemoteTier::connect(
            MockConnector::new(service.clone()),
            RemoteConfig::default(),
            schema,
            Arc::new(MockClock::with_now(0)) as ClockRef,
        )
        .await
        .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_migration_writes_version_and_schema_set() {
        let service = MemoryRemote::default();
        let tier = tier_with(&service, SchemaConfig::default()).await;

        assert_eq!(tier.schema_version(), SCHEMA_VERSION);
        assert_eq!(
            service.get_raw("glossa:meta:version"),
            Some(SCHEMA_VERSION.to_string().into_bytes())
        );
        tier.validate_schema().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_migration_is_idempotent() {
        let service = MemoryRemote::default();
        let tier = tier_with(&service, SchemaConfig::default()).await;

        tier.migrate().await.unwrap();
        tier.migrate().await.unwrap();
        assert_eq!(tier.schema_version(), SCHEMA_VERSION);
    }

    #[test_log::test(tokio::test)]
    async fn test_newer_persisted_version_is_kept() {
        let service = MemoryRemote::default();
        service.put_raw("glossa:meta:version", b"7".to_vec());
        let tier = tier_with(&service, SchemaConfig::default()).await;

        // Version is monotonically non-decreasing; never migrate downwards.
        assert_eq!(tier.schema_version(), 7);
    }

    #[test_log::test(tokio::test)]
    async fn test_validate_detects_missing_schema() {
        let service = MemoryRemote::default();
        let tier = tier_with(&service, SchemaConfig::default()).await;

        service.delete_raw("glossa:meta:version");
        let err = tier.validate_schema().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test_log::test(tokio::test)]
    async fn test_backup_and_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("service.snapshot");
        let backup = dir.path().join("backup.snapshot");

        let service = MemoryRemote::default().with_snapshot_path(&snapshot);
        let schema = SchemaConfig {
            snapshot_filename: snapshot.to_string_lossy().into_owned(),
            ..Default::default()
        };
        let tier = tier_with(&service, schema).await;

        service.put_raw("glossa:precious", b"payload".to_vec());
        tier.backup(&backup).await.unwrap();

        // Lose the live data, then restore from the copy.
        service.put_raw("glossa:precious", b"clobbered".to_vec());
        tier.restore(&backup).await.unwrap();

        assert_eq!(service.get_raw("glossa:precious"), Some(b"payload".to_vec()));
        // The pool came back up.
        tier.ping().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_backup_requires_persistence() {
        let service = MemoryRemote::default();
        let schema = SchemaConfig {
            enabled: false,
            ..Default::default()
        };
        let tier = tier_with(&service, schema).await;

        let err = tier.backup("/tmp/never-written").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);
    }
}
