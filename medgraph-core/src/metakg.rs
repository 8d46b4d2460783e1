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

//! MetaKG catalog types.
//!
//! The MetaKG lists which (input-type, predicate, output-type) operations
//! each downstream API exposes. The catalog itself is an external
//! collaborator; the engine consumes it through the [`MetaKg`] trait to
//! estimate cardinality and to key the cache on the current API universe.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartApi {
    pub id: String,
    /// Sub-query endpoint for this operation.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// Biolink category of the operation's input.
    pub input_type: String,
    /// Biolink category of the operation's output.
    pub output_type: String,
    pub predicate: String,
    pub api_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaOperation {
    pub association: Association,
    pub smartapi: SmartApi,
    /// Whether the API speaks TRAPI natively. Drives attribute shaping.
    #[serde(default)]
    pub is_trapi: bool,
    /// Knowledge source the API reports, as an infores curie.
    #[serde(default)]
    pub source: Option<String>,
}

pub trait MetaKg: Send + Sync {
    /// Operations matching any (subject-category, predicate, object-category)
    /// combination of the given sets. Empty predicate list matches any
    /// predicate.
    fn operations_for(
        &self,
        subject_categories: &[String],
        predicates: &[String],
        object_categories: &[String],
    ) -> Vec<MetaOperation>;

    /// Total number of registered operations.
    fn operation_count(&self) -> usize;

    /// Concatenation of all registered API identifiers, sorted. Feeds the
    /// cache key so the cache invalidates when the API universe changes.
    fn api_fingerprint(&self) -> String;
}
