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

//! Curie and biolink string helpers.
//!
//! Curies are compact URIs of the form `NCBIGene:3778`. Biolink category and
//! predicate strings arrive from clients in both bare (`Gene`, `treats`) and
//! prefixed (`biolink:Gene`, `biolink:treats`) form; everything downstream
//! works on the prefixed canonical form.

const BIOLINK_PREFIX: &str = "biolink:";

/// The namespace prefix of a curie, e.g. `NCBIGene` for `NCBIGene:3778`.
pub fn curie_prefix(curie: &str) -> Option<&str> {
    curie.split_once(':').map(|(prefix, _)| prefix)
}

/// The local part of a curie, e.g. `3778` for `NCBIGene:3778`.
pub fn curie_suffix(curie: &str) -> Option<&str> {
    curie.split_once(':').map(|(_, suffix)| suffix)
}

pub fn is_curie(value: &str) -> bool {
    matches!(value.split_once(':'), Some((prefix, suffix)) if !prefix.is_empty() && !suffix.is_empty())
}

/// Canonicalize a biolink category or predicate to its prefixed form.
pub fn canonical_biolink(value: &str) -> String {
    if value.starts_with(BIOLINK_PREFIX) {
        value.to_string()
    } else {
        format!("{BIOLINK_PREFIX}{value}")
    }
}

/// Strip the `biolink:` prefix if present.
pub fn bare_biolink(value: &str) -> &str {
    value.strip_prefix(BIOLINK_PREFIX).unwrap_or(value)
}
