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

//! Remote key-value tier of the glossa tiered translation cache.
//!
//! The adapter talks to an external key-value service through the
//! [`Connection`]/[`Connector`] seam, so it carries no dependency on any
//! concrete client library. Only the observable contract is modeled:
//! get/set/delete/exists with TTL expressed in whole seconds, a fixed-size
//! connection pool, schema versioning, and snapshot-based backup/restore.

mod codec;
mod command;
mod connection;
mod pool;
mod schema;
mod tier;

/// In-memory stand-in for the remote service, for tests.
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use codec::{decode_entry, encode_entry};
pub use command::{Command, Reply};
pub use connection::{Connection, Connector};
pub use pool::{ConnectionPool, PoolStats};
pub use schema::{SchemaConfig, SCHEMA_VERSION};
pub use tier::{RemoteConfig, RemoteTier};
