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

use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use glossa_common::{
    clock::{ClockRef, SystemClock},
    error::{Error, ErrorKind, Result},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    command::{Command, Reply},
    connection::{Connection, Connector},
    tier::RemoteConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stored {
    value: Vec<u8>,
    expires_at_ms: Option<u64>,
    ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    state: HashMap<String, Stored>,
    sets: HashMap<String, BTreeSet<String>>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<HashMap<String, Stored>>,
    sets: Mutex<HashMap<String, BTreeSet<String>>>,
    config: Mutex<HashMap<String, String>>,
    credential: Mutex<Option<String>>,
    snapshot_path: Mutex<Option<PathBuf>>,
    clock: Mutex<ClockRef>,
    latency_ms: AtomicU64,
    fail_transport: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// In-memory stand-in for the remote key-value service.
///
/// Honors TTL natively like the real service, supports snapshot save/load for
/// backup tests, and can inject latency and transport failures.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    inner: Arc<Inner>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(HashMap::new()),
                sets: Mutex::new(HashMap::new()),
                config: Mutex::new(HashMap::new()),
                credential: Mutex::new(None),
                snapshot_path: Mutex::new(None),
                clock: Mutex::new(Arc::new(SystemClock) as ClockRef),
                latency_ms: AtomicU64::new(0),
                fail_transport: AtomicBool::new(false),
                opened: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
            }),
        }
    }
}

impl MemoryRemote {
    /// Require this credential on every connection.
    pub fn with_credential(self, credential: impl Into<String>) -> Self {
        *self.inner.credential.lock() = Some(credential.into());
        self
    }

    /// Delay every command by `latency_ms`.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        self.inner.latency_ms.store(latency_ms, Ordering::Relaxed);
        self
    }

    /// Drive TTL expiry from `clock` instead of the system time.
    pub fn with_clock(self, clock: ClockRef) -> Self {
        *self.inner.clock.lock() = clock;
        self
    }

    /// File the service writes its snapshot to on `SAVE`.
    pub fn with_snapshot_path(self, path: impl AsRef<Path>) -> Self {
        *self.inner.snapshot_path.lock() = Some(path.as_ref().to_path_buf());
        self
    }

    /// Make every in-flight command fail in transport until turned off.
    pub fn fail_transport(&self, fail: bool) {
        self.inner.fail_transport.store(fail, Ordering::Relaxed);
    }

    /// Connections currently open against the service.
    pub fn open_connections(&self) -> usize {
        self.inner.opened.load(Ordering::Relaxed) - self.inner.closed.load(Ordering::Relaxed)
    }

    /// TTL in whole seconds recorded for `key`, as the service received it.
    pub fn ttl_secs(&self, key: &str) -> Option<u64> {
        self.inner.state.lock().get(key).and_then(|s| s.ttl_secs)
    }

    /// Store raw bytes under `key` without an expiry, bypassing the protocol.
    pub fn put_raw(&self, key: impl Into<String>, value: Vec<u8>) {
        self.inner.state.lock().insert(
            key.into(),
            Stored {
                value,
                expires_at_ms: None,
                ttl_secs: None,
            },
        );
    }

    /// Read raw bytes stored under `key`, ignoring expiry.
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.state.lock().get(key).map(|s| s.value.clone())
    }

    /// Drop `key`, bypassing the protocol.
    pub fn delete_raw(&self, key: &str) {
        self.inner.state.lock().remove(key);
    }

    fn now_ms(&self) -> u64 {
        self.inner.clock.lock().now_ms()
    }

    fn live_value(&self, key: &str) -> Option<Vec<u8>> {
        let now = self.now_ms();
        let mut state = self.inner.state.lock();
        match state.get(key) {
            Some(stored) if stored.expires_at_ms.is_some_and(|at| now >= at) => {
                state.remove(key);
                None
            }
            Some(stored) => Some(stored.value.clone()),
            None => None,
        }
    }

    fn save_snapshot(&self) -> Result<()> {
        let Some(path) = self.inner.snapshot_path.lock().clone() else {
            return Err(Error::new(ErrorKind::Remote, "snapshot path not configured"));
        };
        let snapshot = Snapshot {
            state: self.inner.state.lock().clone(),
            sets: self.inner.sets.lock().clone(),
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn load_snapshot_if_present(&self) {
        let Some(path) = self.inner.snapshot_path.lock().clone() else {
            return;
        };
        let Ok(bytes) = std::fs::read(path) else {
            return;
        };
        let Ok(snapshot) = serde_json::from_slice::<Snapshot>(&bytes) else {
            return;
        };
        *self.inner.state.lock() = snapshot.state;
        *self.inner.sets.lock() = snapshot.sets;
    }

    fn apply(&self, authed: &mut bool, command: Command) -> Reply {
        if let Command::Auth { credential } = &command {
            return match self.inner.credential.lock().as_deref() {
                Some(required) if required == credential => {
                    *authed = true;
                    Reply::Ok
                }
                Some(_) => Reply::Error("invalid credential".to_string()),
                None => Reply::Ok,
            };
        }

        if self.inner.credential.lock().is_some() && !*authed {
            return Reply::Error("authentication required".to_string());
        }

        match command {
            Command::Get { key } => match self.live_value(&key) {
                Some(value) => Reply::Data(value),
                None => Reply::Nil,
            },
            Command::Set { key, value } => {
                self.put_raw(key, value);
                Reply::Ok
            }
            Command::SetEx { key, ttl_secs, value } => {
                let expires_at_ms = self.now_ms() + ttl_secs * 1_000;
                self.inner.state.lock().insert(
                    key,
                    Stored {
                        value,
                        expires_at_ms: Some(expires_at_ms),
                        ttl_secs: Some(ttl_secs),
                    },
                );
                Reply::Ok
            }
            Command::Del { key } => {
                let removed = self.inner.state.lock().remove(&key).is_some();
                Reply::Integer(removed as i64)
            }
            Command::Exists { key } => {
                let in_state = self.live_value(&key).is_some();
                let in_sets = self.inner.sets.lock().contains_key(&key);
                Reply::Integer((in_state || in_sets) as i64)
            }
            Command::SAdd { key, member } => {
                let added = self.inner.sets.lock().entry(key).or_default().insert(member);
                Reply::Integer(added as i64)
            }
            Command::FlushPrefix { prefix } => {
                let mut state = self.inner.state.lock();
                let before = state.len();
                state.retain(|k, _| !k.starts_with(&prefix));
                let removed = before - state.len();
                self.inner.sets.lock().retain(|k, _| !k.starts_with(&prefix));
                Reply::Integer(removed as i64)
            }
            Command::Ping => Reply::Ok,
            Command::ConfigSet { parameter, value } => {
                self.inner.config.lock().insert(parameter, value);
                Reply::Ok
            }
            Command::Save => match self.save_snapshot() {
                Ok(()) => Reply::Ok,
                Err(e) => Reply::Error(e.to_string()),
            },
            Command::Auth { .. } => unreachable!("handled above"),
        }
    }
}

/// Connector producing [`MockConnection`]s against a shared [`MemoryRemote`].
#[derive(Debug, Clone)]
pub struct MockConnector {
    service: MemoryRemote,
}

impl MockConnector {
    /// Create a connector bound to `service`.
    pub fn new(service: MemoryRemote) -> Self {
        Self { service }
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, _config: &RemoteConfig) -> Result<Self::Connection> {
        self.service.load_snapshot_if_present();
        self.service.inner.opened.fetch_add(1, Ordering::Relaxed);
        Ok(MockConnection {
            service: self.service.clone(),
            authed: false,
        })
    }
}

/// One mock connection.
#[derive(Debug)]
pub struct MockConnection {
    service: MemoryRemote,
    authed: bool,
}

impl Connection for MockConnection {
    async fn call(&mut self, command: Command) -> Result<Reply> {
        let latency = self.service.inner.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.service.inner.fail_transport.load(Ordering::Relaxed) {
            return Err(Error::new(ErrorKind::Remote, "injected transport failure"));
        }
        Ok(self.service.apply(&mut self.authed, command))
    }

    async fn close(&mut self) -> Result<()> {
        self.service.inner.closed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
