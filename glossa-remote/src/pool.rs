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
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use glossa_common::{
    clock::ClockRef,
    error::{Error, ErrorKind, Result},
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::{
    command::{Command, Reply},
    connection::{Connection, Connector},
    tier::RemoteConfig,
};

/// Consecutive transport errors on one connection before it is re-established.
const MAX_ERROR_COUNT: u32 = 3;

/// Monotonic operation counters for one pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Commands dispatched.
    pub total_commands: u64,
    /// Commands that failed in transport or were rejected by the service.
    pub failed_commands: u64,
    /// Connections re-established after repeated transport errors.
    pub reconnections: u64,
}

#[derive(Debug)]
struct Slot<T> {
    conn: T,
    last_used: u64,
    error_count: u32,
}

/// Fixed-size connection pool with bounded checkout.
///
/// All connections are established eagerly at construction; a failure during
/// pool fill tears down the partially built pool and fails the call. At most
/// `pool_size` operations are in flight at once; an additional checkout waits
/// up to the configured timeout and then fails with
/// [`ErrorKind::Timeout`] instead of busy-polling.
#[derive(Debug)]
pub struct ConnectionPool<C>
where
    C: Connector,
{
    connector: C,
    config: RemoteConfig,
    clock: ClockRef,

    semaphore: Semaphore,
    idle: Mutex<Vec<Slot<C::Connection>>>,
    closed: AtomicBool,

    total_commands: AtomicU64,
    failed_commands: AtomicU64,
    reconnections: AtomicU64,
}

impl<C> ConnectionPool<C>
where
    C: Connector,
{
    /// Establish the full pool.
    pub async fn connect(connector: C, config: RemoteConfig, clock: ClockRef) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(Error::new(ErrorKind::InvalidParam, "pool_size must be positive"));
        }

        let now = clock.now_ms();
        let mut slots: Vec<Slot<C::Connection>> = Vec::with_capacity(config.pool_size);
        for i in 0..config.pool_size {
            match Self::establish(&connector, &config).await {
                Ok(conn) => slots.push(Slot {
                    conn,
                    last_used: now,
                    error_count: 0,
                }),
                Err(e) => {
                    for mut slot in slots {
                        let _ = slot.conn.close().await;
                    }
                    return Err(e.with_context("established_connections", i));
                }
            }
        }

        tracing::info!(pool_size = config.pool_size, host = %config.host, "connection pool established");

        Ok(Self {
            connector,
            semaphore: Semaphore::new(config.pool_size),
            idle: Mutex::new(slots),
            closed: AtomicBool::new(false),
            config,
            clock,
            total_commands: AtomicU64::new(0),
            failed_commands: AtomicU64::new(0),
            reconnections: AtomicU64::new(0),
        })
    }

    async fn establish(connector: &C, config: &RemoteConfig) -> Result<C::Connection> {
        let budget = Duration::from_millis(config.timeout_ms);
        let mut conn = tokio::time::timeout(budget, connector.connect(config))
            .await
            .map_err(|_| Error::timeout("connect", config.timeout_ms))??;

        if let Some(credential) = &config.credential {
            let auth = Command::Auth {
                credential: credential.clone(),
            };
            let reply = match tokio::time::timeout(budget, conn.call(auth)).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    let _ = conn.close().await;
                    return Err(e);
                }
                Err(_) => {
                    let _ = conn.close().await;
                    return Err(Error::timeout("auth", config.timeout_ms));
                }
            };
            if let Reply::Error(message) = reply {
                let _ = conn.close().await;
                return Err(Error::new(ErrorKind::Remote, "authentication rejected").with_context("service", message));
            }
        }

        Ok(conn)
    }

    /// Check out a connection, run one command on it, and return it.
    pub async fn execute(&self, command: Command) -> Result<Reply> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::new(ErrorKind::Closed, "connection pool has been torn down"));
        }

        let budget = Duration::from_millis(self.config.timeout_ms);
        let permit = tokio::time::timeout(budget, self.semaphore.acquire())
            .await
            .map_err(|_| Error::timeout("connection checkout", self.config.timeout_ms))?
            .map_err(|_| Error::new(ErrorKind::Closed, "connection pool has been torn down"))?;

        let mut slot = self
            .idle
            .lock()
            .pop()
            .ok_or_else(|| Error::new(ErrorKind::Internal, "pool permit issued without an idle connection"))?;

        let result = tokio::time::timeout(budget, slot.conn.call(command))
            .await
            .map_err(|_| Error::timeout("remote command", self.config.timeout_ms))
            .and_then(|r| r);

        self.total_commands.fetch_add(1, Ordering::Relaxed);
        slot.last_used = self.clock.now_ms();
        match &result {
            Ok(reply) if reply.is_error() => {
                self.failed_commands.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => slot.error_count = 0,
            Err(_) => {
                self.failed_commands.fetch_add(1, Ordering::Relaxed);
                slot.error_count += 1;
                if slot.error_count >= MAX_ERROR_COUNT {
                    self.reset_slot(&mut slot).await;
                }
            }
        }

        if self.closed.load(Ordering::Acquire) {
            let _ = slot.conn.close().await;
        } else {
            self.idle.lock().push(slot);
        }
        drop(permit);

        result
    }

    /// Replace a connection that keeps failing. Failure to reconnect leaves
    /// the old connection in place to be retried later.
    async fn reset_slot(&self, slot: &mut Slot<C::Connection>) {
        match Self::establish(&self.connector, &self.config).await {
            Ok(conn) => {
                let mut old = std::mem::replace(&mut slot.conn, conn);
                let _ = old.close().await;
                slot.error_count = 0;
                self.reconnections.fetch_add(1, Ordering::Relaxed);
                tracing::info!("re-established a failing pooled connection");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to re-establish a pooled connection");
            }
        }
    }

    /// Tear the pool down, closing every idle connection. Connections checked
    /// out at this moment are closed on return.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let slots = std::mem::take(&mut *self.idle.lock());
        for mut slot in slots {
            let _ = slot.conn.close().await;
        }
        tracing::info!("connection pool closed");
    }

    /// Configured pool size.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Connections currently available for checkout.
    pub fn available_connections(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_commands: self.total_commands.load(Ordering::Relaxed),
            failed_commands: self.failed_commands.load(Ordering::Relaxed),
            reconnections: self.reconnections.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glossa_common::clock::MockClock;

    use super::*;
    use crate::test_utils::{MemoryRemote, MockConnector};

    fn config(pool_size: usize, timeout_ms: u64) -> RemoteConfig {
        RemoteConfig {
            pool_size,
            timeout_ms,
            ..Default::default()
        }
    }

    fn clock() -> ClockRef {
        Arc::new(MockClock::with_now(0))
    }

    #[test_log::test(tokio::test)]
    async fn test_pool_round_trip() {
        let service = MemoryRemote::default();
        let pool = ConnectionPool::connect(MockConnector::new(service.clone()), config(2, 1_000), clock())
            .await
            .unwrap();

        let reply = pool
            .execute(Command::Set {
                key: "k".into(),
                value: b"v".to_vec(),
            })
            .await
            .unwrap();
        assert_eq!(reply, Reply::Ok);

        let reply = pool.execute(Command::Get { key: "k".into() }).await.unwrap();
        assert_eq!(reply, Reply::Data(b"v".to_vec()));

        assert_eq!(pool.stats().total_commands, 2);
        assert_eq!(pool.stats().failed_commands, 0);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_pool_exhaustion_times_out_instead_of_deadlocking() {
        let service = MemoryRemote::default().with_latency_ms(200);
        let pool = Arc::new(
            ConnectionPool::connect(MockConnector::new(service.clone()), config(2, 50), clock())
                .await
                .unwrap(),
        );

        let mut slow = Vec::new();
        for _ in 0..2 {
            let pool = pool.clone();
            slow.push(tokio::spawn(async move { pool.execute(Command::Ping).await }));
        }
        // Let both tasks claim their permits before the extra checkout.
        while pool.available_connections() > 0 {
            tokio::task::yield_now().await;
        }

        let err = pool.execute(Command::Ping).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        // The in-flight operations themselves hit the 50ms budget as well;
        // what matters here is that the pool never exceeded its size and all
        // permits came back.
        for task in slow {
            let _ = task.await.unwrap();
        }
        assert_eq!(pool.available_connections(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_pool_fill_failure_tears_down_partial_pool() {
        let service = MemoryRemote::default().with_credential("s3cret");
        let config = RemoteConfig {
            pool_size: 4,
            credential: Some("wrong".into()),
            ..Default::default()
        };
        let err = ConnectionPool::connect(MockConnector::new(service.clone()), config, clock())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(service.open_connections(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_pool_authenticates_with_credential() {
        let service = MemoryRemote::default().with_credential("s3cret");
        let config = RemoteConfig {
            pool_size: 2,
            credential: Some("s3cret".into()),
            ..Default::default()
        };
        let pool = ConnectionPool::connect(MockConnector::new(service.clone()), config, clock())
            .await
            .unwrap();

        assert_eq!(pool.execute(Command::Ping).await.unwrap(), Reply::Ok);
    }

    #[test_log::test(tokio::test)]
    async fn test_pool_reconnects_after_repeated_transport_errors() {
        let service = MemoryRemote::default();
        let pool = ConnectionPool::connect(MockConnector::new(service.clone()), config(1, 1_000), clock())
            .await
            .unwrap();

        service.fail_transport(true);
        for _ in 0..3 {
            assert!(pool.execute(Command::Ping).await.is_err());
        }
        service.fail_transport(false);

        assert_eq!(pool.execute(Command::Ping).await.unwrap(), Reply::Ok);
        let stats = pool.stats();
        assert_eq!(stats.reconnections, 1);
        assert_eq!(stats.failed_commands, 3);
    }

    #[test_log::test(tokio::test)]
    async fn test_closed_pool_rejects_checkout() {
        let service = MemoryRemote::default();
        let pool = ConnectionPool::connect(MockConnector::new(service.clone()), config(2, 1_000), clock())
            .await
            .unwrap();

        pool.close().await;
        let err = pool.execute(Command::Ping).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
        assert_eq!(service.open_connections(), 0);
    }
}
