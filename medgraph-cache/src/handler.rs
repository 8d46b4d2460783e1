// Copyright 2025 Medgraph (https://github.com/medgraph)
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

//! Cache handler.
//!
//! Memoizes the record set of one execution edge under its composite key.
//! Reads and writes of a key run under the backend's single-writer lock so
//! a reader never observes a partial write. The disabled path (operator
//! opt-out or unconfigured backend) takes no locks at all.

use crate::backend::CacheBackend;
use crate::codec;
use crate::key::CacheKey;
use medgraph_core::{Record, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

pub struct CacheHandler {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl: Duration,
}

impl CacheHandler {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            ttl,
        }
    }

    /// Handler with no backing store: `lookup` misses, `store` is a no-op.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Fetch the memoized record set for `key`, restoring the qedge
    /// back-reference dropped at encode time. Decode failures degrade to a
    /// miss; the lock guard drops on every path.
    pub async fn lookup(&self, key: &CacheKey, qedge_id: &str) -> Result<Option<Vec<Record>>> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };
        let storage_key = key.storage_key();

        let _lock = backend.lock(&storage_key).await?;
        let mut fields = backend.hgetall(&storage_key).await?;
        if fields.is_empty() {
            debug!(key = %storage_key, "cache miss");
            return Ok(None);
        }

        // Chunks were written under ordinal field names; restore write order.
        fields.sort_by_key(|(field, _)| field.parse::<u64>().unwrap_or(u64::MAX));
        let chunks: Vec<String> = fields.into_iter().map(|(_, value)| value).collect();

        let mut records = codec::decode(&chunks);
        if records.is_empty() {
            warn!(key = %storage_key, "cached payload decoded to nothing, treating as miss");
            return Ok(None);
        }
        for record in &mut records {
            record.qedge_id = Some(qedge_id.to_string());
        }
        debug!(key = %storage_key, records = records.len(), "cache hit");
        Ok(Some(records))
    }

    /// Write the record set for `key` as ordered chunks and arm the TTL.
    pub async fn store(&self, key: &CacheKey, records: &[Record]) -> Result<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let storage_key = key.storage_key();
        let chunks = codec::encode(records)?;

        let _lock = backend.lock(&storage_key).await?;
        backend.del(&storage_key).await?;
        for (index, chunk) in chunks.iter().enumerate() {
            backend.hset(&storage_key, &index.to_string(), chunk).await?;
        }
        backend.expire(&storage_key, self.ttl).await?;
        debug!(key = %storage_key, chunks = chunks.len(), records = records.len(), "cache store");
        Ok(())
    }
}
