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

//! Core behavior configuration.
//!
//! Declares which record fields are identity-bearing for fingerprinting and
//! which downstream APIs count as curated direct sources for attribute
//! shaping. Both lists are deployment configuration, not code.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoreConfig {
    /// Record field names that participate in the record fingerprint.
    /// The fingerprint must be stable across processes, so the order here
    /// is irrelevant; fields are hashed in sorted order.
    #[serde(default = "default_identity_fields")]
    pub record_identity_fields: Vec<String>,

    /// API names whose records are promoted to primary + supporting
    /// knowledge sources instead of the generic aggregator shape.
    #[serde(default = "default_curated_sources")]
    pub curated_direct_sources: Vec<String>,
}

fn default_identity_fields() -> Vec<String> {
    ["subject", "object", "predicate", "api", "source"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_curated_sources() -> Vec<String> {
    ["CTD API", "DGIdb API", "DISEASES API"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            record_identity_fields: default_identity_fields(),
            curated_direct_sources: default_curated_sources(),
        }
    }
}

impl CoreConfig {
    pub fn is_curated_source(&self, api_name: &str) -> bool {
        self.curated_direct_sources.iter().any(|s| s == api_name)
    }
}
