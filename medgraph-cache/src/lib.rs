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

//! Medgraph Cache
//!
//! Memoizes per-edge record sets under a composite key that covers both the
//! edge shape and the downstream API universe. Payloads are LZ4-compressed,
//! base64url-encoded, and chunked; keys are guarded by a single-writer lock
//! and expire on a configurable TTL.

pub mod backend;
pub mod codec;
pub mod handler;
pub mod key;

pub use backend::{CacheBackend, KeyLock, MemoryBackend};
pub use handler::{CacheHandler, DEFAULT_TTL};
pub use key::CacheKey;
