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

//! Cache key computation.
//!
//! The key fingerprints everything that determines an execution edge's
//! record set: the edge shape (categories, predicates, input curies) and
//! the current downstream API universe (operation count plus concatenated
//! API identifiers). Any registry change therefore invalidates the cache.
//! Set-valued inputs are sorted before hashing so the key is independent of
//! client ordering.

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: [u8; 32],
}

impl CacheKey {
    pub fn new(
        subject_categories: &[String],
        predicates: &[String],
        object_categories: &[String],
        input_curies: &[String],
        metakg_size: usize,
        api_fingerprint: &str,
    ) -> Self {
        let mut hasher = Sha256::new();

        for set in [subject_categories, predicates, object_categories, input_curies] {
            let mut sorted: Vec<&String> = set.iter().collect();
            sorted.sort();
            for item in sorted {
                hasher.update(item.as_bytes());
                hasher.update(b",");
            }
            hasher.update(b"|");
        }

        hasher.update(metakg_size.to_le_bytes());
        hasher.update(b"|");
        hasher.update(api_fingerprint.as_bytes());

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        Self { hash }
    }

    /// Backend key string, namespaced for shared key spaces.
    pub fn storage_key(&self) -> String {
        format!("medgraph:records:{}", hex::encode(self.hash))
    }
}
