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

//! Identifier-resolution client.
//!
//! Posts curie batches to the resolution service and memoizes per-curie
//! results so repeated queries do not re-resolve. Curies the service does
//! not know degrade to identity normalization.

use async_trait::async_trait;
use medgraph_core::{IdResolver, NormalizedCurie, Result};
use moka::sync::Cache;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

const MEMO_CAPACITY: u64 = 100_000;
const MEMO_TTL: Duration = Duration::from_secs(86400);

#[derive(Debug, Deserialize)]
struct ResolvedEntry {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    equivalent_identifiers: Vec<String>,
}

pub struct HttpResolver {
    client: reqwest::Client,
    endpoint: String,
    memo: Cache<String, NormalizedCurie>,
}

impl HttpResolver {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| medgraph_core::MedgraphError::Resolver(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            memo: Cache::builder()
                .max_capacity(MEMO_CAPACITY)
                .time_to_live(MEMO_TTL)
                .build(),
        })
    }

    async fn resolve_remote(&self, curies: &[String]) -> Result<HashMap<String, ResolvedEntry>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "curies": curies }))
            .send()
            .await
            .map_err(|e| medgraph_core::MedgraphError::Resolver(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| medgraph_core::MedgraphError::Resolver(e.to_string()))?
            .json()
            .await
            .map_err(|e| medgraph_core::MedgraphError::Resolver(e.to_string()))
    }
}

#[async_trait]
impl IdResolver for HttpResolver {
    async fn resolve(&self, curies: &[String]) -> Result<HashMap<String, NormalizedCurie>> {
        let mut resolved = HashMap::with_capacity(curies.len());
        let mut missing = Vec::new();
        for curie in curies {
            match self.memo.get(curie) {
                Some(hit) => {
                    resolved.insert(curie.clone(), hit);
                }
                None => missing.push(curie.clone()),
            }
        }

        if !missing.is_empty() {
            match self.resolve_remote(&missing).await {
                Ok(entries) => {
                    for curie in &missing {
                        let normalized = entries
                            .get(curie)
                            .map(|entry| NormalizedCurie {
                                primary: entry.id.clone(),
                                label: entry.label.clone(),
                                equivalent_curies: entry.equivalent_identifiers.clone(),
                            })
                            .unwrap_or_else(|| NormalizedCurie::identity(curie));
                        self.memo.insert(curie.clone(), normalized.clone());
                        resolved.insert(curie.clone(), normalized);
                    }
                }
                Err(e) => {
                    // Resolution failures never abort a query; fall back to
                    // identity normalization for the whole batch.
                    warn!(error = %e, curies = missing.len(), "identifier resolution failed");
                    for curie in &missing {
                        resolved.insert(curie.clone(), NormalizedCurie::identity(curie));
                    }
                }
            }
        }

        Ok(resolved)
    }
}
