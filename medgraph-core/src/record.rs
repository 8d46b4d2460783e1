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

//! Records: the unit exchanged with downstream APIs.
//!
//! A record is one (subject, predicate, object) observation with provenance.
//! Records originate from heterogeneous APIs, so beyond a handful of typed
//! fields they carry an open-ended attribute map. Identity is a SHA-256
//! fingerprint over the subset of fields declared identity-bearing in
//! [`CoreConfig`](crate::config::CoreConfig).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Normalized identity for one entity, as returned by the identifier
/// resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCurie {
    /// Canonical primary curie.
    pub primary: String,
    /// Human-readable label, when the resolver knows one.
    pub label: Option<String>,
    /// Equivalent curies in other namespaces, primary excluded.
    #[serde(default)]
    pub equivalent_curies: Vec<String>,
}

impl NormalizedCurie {
    /// Identity normalization: the curie maps to itself with no equivalents.
    /// Used when the resolver cannot resolve a curie.
    pub fn identity(curie: &str) -> Self {
        Self {
            primary: curie.to_string(),
            label: None,
            equivalent_curies: Vec::new(),
        }
    }
}

/// One endpoint of a record: the original string the API returned plus its
/// normalized identity and semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordNode {
    pub original: String,
    pub normalized: NormalizedCurie,
    /// Biolink category, e.g. `biolink:Gene`.
    pub category: Option<String>,
}

impl RecordNode {
    pub fn curie(&self) -> &str {
        &self.normalized.primary
    }
}

/// One observation fetched from a downstream API.
///
/// `subject` is always the execution-input side of the sub-query that
/// produced the record; `object` is the output side. The owning execution
/// edge's `reverse` flag maps these back onto query-graph nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub subject: RecordNode,
    pub object: RecordNode,
    pub predicate: String,
    /// Name of the API that produced this record.
    pub api_name: String,
    /// Knowledge source, as an infores curie when known.
    pub source: String,
    /// Whether the producing API is itself TRAPI-native. Drives attribute
    /// shaping in the knowledge-graph builder.
    #[serde(default)]
    pub api_is_trapi: bool,
    #[serde(default)]
    pub publications: Vec<String>,
    /// Open-ended per-API attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Endpoint-declared set semantics.
    #[serde(default)]
    pub is_set: bool,
    /// Identity fingerprint. Assigned via [`Record::compute_fingerprint`]
    /// before the record enters the pipeline.
    #[serde(default)]
    pub hash: String,
    /// Back-reference to the owning query edge. Dropped on cache encode and
    /// restored on read.
    #[serde(skip)]
    pub qedge_id: Option<String>,
}

impl Record {
    /// Fingerprint over the identity-bearing fields. Fields are hashed in
    /// sorted order so the hash is independent of configuration order, and
    /// set-valued fields are sorted before hashing so the hash is stable
    /// across processes.
    pub fn compute_fingerprint(&self, identity_fields: &[String]) -> String {
        let mut fields: Vec<&String> = identity_fields.iter().collect();
        fields.sort();
        fields.dedup();

        let mut hasher = Sha256::new();
        for field in fields {
            hasher.update(field.as_bytes());
            hasher.update(b"=");
            hasher.update(self.field_value(field).as_bytes());
            hasher.update(b"|");
        }
        hex::encode(hasher.finalize())
    }

    fn field_value(&self, field: &str) -> String {
        match field {
            "subject" => self.subject.normalized.primary.clone(),
            "object" => self.object.normalized.primary.clone(),
            "subject_original" => self.subject.original.clone(),
            "object_original" => self.object.original.clone(),
            "predicate" => self.predicate.clone(),
            "api" => self.api_name.clone(),
            "source" => self.source.clone(),
            "publications" => {
                let mut pubs = self.publications.clone();
                pubs.sort();
                pubs.join(",")
            }
            other => self
                .attributes
                .get(other)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, object: &str) -> Record {
        Record {
            subject: RecordNode {
                original: subject.to_string(),
                normalized: NormalizedCurie::identity(subject),
                category: Some("biolink:Gene".into()),
            },
            object: RecordNode {
                original: object.to_string(),
                normalized: NormalizedCurie::identity(object),
                category: Some("biolink:Disease".into()),
            },
            predicate: "biolink:related_to".into(),
            api_name: "Test API".into(),
            source: "infores:test".into(),
            api_is_trapi: false,
            publications: vec!["PMID:2".into(), "PMID:1".into()],
            attributes: BTreeMap::new(),
            is_set: false,
            hash: String::new(),
            qedge_id: None,
        }
    }

    fn identity_fields() -> Vec<String> {
        ["subject", "object", "predicate", "api", "source"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_fingerprint_stable_across_field_order() {
        let rec = record("NCBIGene:3778", "MONDO:0011122");
        let forward = rec.compute_fingerprint(&identity_fields());
        let mut reversed_fields = identity_fields();
        reversed_fields.reverse();
        assert_eq!(forward, rec.compute_fingerprint(&reversed_fields));
    }

    #[test]
    fn test_fingerprint_distinguishes_identity_fields() {
        let a = record("NCBIGene:3778", "MONDO:0011122");
        let b = record("NCBIGene:7289", "MONDO:0011122");
        assert_ne!(
            a.compute_fingerprint(&identity_fields()),
            b.compute_fingerprint(&identity_fields())
        );
    }

    #[test]
    fn test_fingerprint_ignores_non_identity_fields() {
        let mut a = record("NCBIGene:3778", "MONDO:0011122");
        let mut b = a.clone();
        a.publications = vec!["PMID:1".into()];
        b.publications = vec!["PMID:9".into()];
        assert_eq!(
            a.compute_fingerprint(&identity_fields()),
            b.compute_fingerprint(&identity_fields())
        );
    }

    #[test]
    fn test_publication_field_sorted_when_identity_bearing() {
        let mut fields = identity_fields();
        fields.push("publications".into());
        let mut a = record("NCBIGene:3778", "MONDO:0011122");
        let mut b = a.clone();
        a.publications = vec!["PMID:2".into(), "PMID:1".into()];
        b.publications = vec!["PMID:1".into(), "PMID:2".into()];
        assert_eq!(a.compute_fingerprint(&fields), b.compute_fingerprint(&fields));
    }
}
