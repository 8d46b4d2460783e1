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

//! MetaKG operation registry.
//!
//! Holds the catalog of downstream operations, indexed by the
//! (input-type, predicate, output-type) triple for O(1) edge expansion.
//! The registry also fingerprints the API universe for cache keying.

use dashmap::DashMap;
use medgraph_core::{MetaKg, MetaOperation, Result};
use std::path::Path;
use tracing::info;

type Triple = (String, String, String);

#[derive(Default)]
pub struct OperationRegistry {
    by_triple: DashMap<Triple, Vec<MetaOperation>>,
    operations: Vec<MetaOperation>,
}

impl OperationRegistry {
    pub fn new(operations: Vec<MetaOperation>) -> Self {
        let by_triple: DashMap<Triple, Vec<MetaOperation>> = DashMap::new();
        for op in &operations {
            let triple = (
                op.association.input_type.clone(),
                op.association.predicate.clone(),
                op.association.output_type.clone(),
            );
            by_triple.entry(triple).or_default().push(op.clone());
        }
        Self {
            by_triple,
            operations,
        }
    }

    /// Load the catalog from a JSON file holding a list of operations.
    pub fn from_catalog_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let operations: Vec<MetaOperation> = serde_json::from_str(&content)?;
        info!(
            operations = operations.len(),
            path = %path.as_ref().display(),
            "loaded MetaKG catalog"
        );
        Ok(Self::new(operations))
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl MetaKg for OperationRegistry {
    fn operations_for(
        &self,
        subject_categories: &[String],
        predicates: &[String],
        object_categories: &[String],
    ) -> Vec<MetaOperation> {
        let mut out = Vec::new();
        for subject in subject_categories {
            for object in object_categories {
                if predicates.is_empty() {
                    // Any-predicate edges scan the triple space for the
                    // category pair.
                    for entry in self.by_triple.iter() {
                        let (s, _, o) = entry.key();
                        if s == subject && o == object {
                            out.extend(entry.value().iter().cloned());
                        }
                    }
                } else {
                    for predicate in predicates {
                        let triple = (subject.clone(), predicate.clone(), object.clone());
                        if let Some(ops) = self.by_triple.get(&triple) {
                            out.extend(ops.iter().cloned());
                        }
                    }
                }
            }
        }
        out
    }

    fn operation_count(&self) -> usize {
        self.operations.len()
    }

    fn api_fingerprint(&self) -> String {
        let mut ids: Vec<&str> = self
            .operations
            .iter()
            .map(|op| op.smartapi.id.as_str())
            .collect();
        ids.sort();
        ids.dedup();
        ids.join(",")
    }
}
