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

//! Cache backend abstraction.
//!
//! The handler talks to a redis-shaped key-value store: hash-field writes,
//! full-hash reads, per-key TTL, and a single-writer lock per key. The
//! in-process [`MemoryBackend`] implements the same surface so the handler
//! behaves identically whether the store is local or remote.

use async_trait::async_trait;
use dashmap::DashMap;
use medgraph_core::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held for the duration of one key's read-or-write. Dropping the guard
/// releases the lock, so every exit path releases.
pub trait KeyLock: Send {}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// All (field, value) pairs under `key`, unordered.
    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>>;

    async fn del(&self, key: &str) -> Result<()>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Acquire the single-writer lock for `key`; waiters block.
    async fn lock(&self, key: &str) -> Result<Box<dyn KeyLock>>;
}

struct MemoryLock {
    _guard: OwnedMutexGuard<()>,
}

impl KeyLock for MemoryLock {}

/// In-process backend: hash fields in a `DashMap`, lazily-swept TTLs, and
/// one async mutex per key for the lock discipline.
#[derive(Default)]
pub struct MemoryBackend {
    hashes: DashMap<String, BTreeMap<String, String>>,
    expirations: DashMap<String, Instant>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep(&self, key: &str) {
        if let Some(deadline) = self.expirations.get(key).map(|d| *d) {
            if Instant::now() >= deadline {
                self.hashes.remove(key);
                self.expirations.remove(key);
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        self.sweep(key);
        Ok(self
            .hashes
            .get(key)
            .map(|fields| fields.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.hashes.remove(key);
        self.expirations.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.expirations
            .insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn lock(&self, key: &str) -> Result<Box<dyn KeyLock>> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        Ok(Box::new(MemoryLock { _guard: guard }))
    }
}
