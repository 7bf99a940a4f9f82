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

use std::future::Future;

use glossa_common::error::Result;

use crate::{command::Command, tier::RemoteConfig, Reply};

/// One established connection to the remote service.
///
/// A connection is owned by at most one in-flight operation at a time; the
/// pool enforces exclusivity, so implementations need no internal locking.
/// Transport failures surface as [`glossa_common::error::ErrorKind::Remote`]
/// errors; a [`Reply::Error`] means the service itself rejected the command.
pub trait Connection: Send + 'static {
    /// Send one command and read its reply.
    fn call(&mut self, command: Command) -> impl Future<Output = Result<Reply>> + Send;

    /// Close the connection. Dropping without closing must not leak.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Connection factory.
///
/// Transport-level concerns such as TLS negotiation live inside `connect`;
/// authentication is driven by the pool afterwards so that every connector
/// gets identical credential handling.
pub trait Connector: Send + Sync + 'static {
    /// The connection type this connector produces.
    type Connection: Connection;

    /// Establish one connection to the service described by `config`.
    fn connect(&self, config: &RemoteConfig) -> impl Future<Output = Result<Self::Connection>> + Send;
}
