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

/// One request to the remote key-value service.
///
/// This models the observable contract only; how a connector encodes a
/// command on the wire is its own business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read the value stored under `key`.
    Get {
        /// Fully prefixed key.
        key: String,
    },
    /// Unconditionally store `value` under `key` without an expiry.
    Set {
        /// Fully prefixed key.
        key: String,
        /// Raw payload.
        value: Vec<u8>,
    },
    /// Upsert `value` under `key` with a service-managed expiry.
    SetEx {
        /// Fully prefixed key.
        key: String,
        /// Expiry in whole seconds.
        ttl_secs: u64,
        /// Raw payload.
        value: Vec<u8>,
    },
    /// Delete `key`.
    Del {
        /// Fully prefixed key.
        key: String,
    },
    /// Whether `key` currently exists.
    Exists {
        /// Fully prefixed key.
        key: String,
    },
    /// Add `member` to the set stored under `key`.
    SAdd {
        /// Fully prefixed key.
        key: String,
        /// Set member.
        member: String,
    },
    /// Drop every key under `prefix`.
    FlushPrefix {
        /// Namespace prefix.
        prefix: String,
    },
    /// Liveness probe.
    Ping,
    /// Authenticate the connection. Sent once per connection at pool fill.
    Auth {
        /// Service credential.
        credential: String,
    },
    /// Change a service configuration parameter.
    ConfigSet {
        /// Parameter name.
        parameter: String,
        /// Parameter value.
        value: String,
    },
    /// Trigger the service's native snapshot.
    Save,
}

/// One response from the remote key-value service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command succeeded without a payload.
    Ok,
    /// The requested key is absent.
    Nil,
    /// Payload bytes.
    Data(Vec<u8>),
    /// Numeric result, e.g. an existence or deletion count.
    Integer(i64),
    /// Service-reported failure.
    Error(String),
}

impl Reply {
    /// Whether this is a service-reported failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
