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

//! Batch edge query handler.
//!
//! Turns one execution edge into concrete downstream calls: consult the
//! cache first, expand the edge into per-API sub-queries via the MetaKG
//! registry, fan out with bounded concurrency, normalize identifiers on
//! the way back, and write the result set back to the cache. A failing or
//! timed-out API contributes zero records and a tally entry; it never
//! fails the edge.

use crate::metakg::OperationRegistry;
use async_trait::async_trait;
use medgraph_cache::{CacheHandler, CacheKey};
use medgraph_core::{
    CoreConfig, IdResolver, MedgraphError, MetaKg, MetaOperation, NormalizedCurie, QueryLog,
    Record, RecordNode, Result,
};
use medgraph_query::{BatchEdgeHandler, EdgeQuery};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// One row of a downstream sub-query response.
#[derive(Debug, Clone, Deserialize)]
pub struct SubqueryRow {
    pub subject: String,
    pub object: String,
    #[serde(default)]
    pub publications: Vec<String>,
    #[serde(default)]
    pub is_set: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Transport seam for one concrete API call, so tests can script responses
/// without a network.
#[async_trait]
pub trait SubqueryTransport: Send + Sync {
    async fn call(&self, operation: &MetaOperation, curies: &[String]) -> Result<Vec<SubqueryRow>>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MedgraphError::Internal(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SubqueryTransport for ReqwestTransport {
    async fn call(&self, operation: &MetaOperation, curies: &[String]) -> Result<Vec<SubqueryRow>> {
        let body = serde_json::json!({
            "curies": curies,
            "predicate": operation.association.predicate,
            "input_type": operation.association.input_type,
            "output_type": operation.association.output_type,
        });
        let response = self
            .client
            .post(&operation.smartapi.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MedgraphError::downstream(&operation.association.api_name, e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| MedgraphError::downstream(&operation.association.api_name, e.to_string()))?
            .json()
            .await
            .map_err(|e| MedgraphError::downstream(&operation.association.api_name, e.to_string()))
    }
}

pub struct ApiBatchHandler {
    registry: Arc<OperationRegistry>,
    transport: Arc<dyn SubqueryTransport>,
    resolver: Arc<dyn IdResolver>,
    cache: Arc<CacheHandler>,
    core: CoreConfig,
    semaphore: Arc<Semaphore>,
}

impl ApiBatchHandler {
    pub fn new(
        registry: Arc<OperationRegistry>,
        transport: Arc<dyn SubqueryTransport>,
        resolver: Arc<dyn IdResolver>,
        cache: Arc<CacheHandler>,
        core: CoreConfig,
        max_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            transport,
            resolver,
            cache,
            core,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    fn cache_key(&self, query: &EdgeQuery) -> CacheKey {
        CacheKey::new(
            &query.subject_categories,
            &query.predicates,
            &query.object_categories,
            &query.input_curies,
            self.registry.operation_count(),
            &self.registry.api_fingerprint(),
        )
    }

    /// Fan out one sub-query per operation under the concurrency bound.
    async fn fan_out(
        &self,
        operations: &[MetaOperation],
        query: &EdgeQuery,
        log: &QueryLog,
    ) -> Vec<(MetaOperation, Vec<SubqueryRow>)> {
        let calls = operations.iter().map(|operation| {
            let semaphore = self.semaphore.clone();
            let transport = self.transport.clone();
            let curies = query.input_curies.clone();
            async move {
                // Held for the duration of one call.
                let _permit = semaphore.acquire().await;
                let rows = transport.call(operation, &curies).await;
                (operation.clone(), rows)
            }
        });

        let mut out = Vec::new();
        for (operation, outcome) in futures::future::join_all(calls).await {
            match outcome {
                Ok(rows) => {
                    log.tally_success(&operation.association.api_name);
                    debug!(
                        api = %operation.association.api_name,
                        rows = rows.len(),
                        "sub-query succeeded"
                    );
                    out.push((operation, rows));
                }
                Err(e) => {
                    // A timed-out or failing API is a zero-record outcome
                    // for that API, not for the edge.
                    log.tally_failure(&operation.association.api_name);
                    log.warn(format!(
                        "API {} failed: {e}",
                        operation.association.api_name
                    ));
                }
            }
        }
        out
    }

    async fn build_records(
        &self,
        query: &EdgeQuery,
        responses: Vec<(MetaOperation, Vec<SubqueryRow>)>,
    ) -> Result<Vec<Record>> {
        let mut curies: Vec<String> = responses
            .iter()
            .flat_map(|(_, rows)| rows.iter())
            .flat_map(|row| [row.subject.clone(), row.object.clone()])
            .collect();
        curies.sort();
        curies.dedup();
        let normalized = self.resolver.resolve(&curies).await?;
        let lookup = |curie: &str| -> NormalizedCurie {
            normalized
                .get(curie)
                .cloned()
                .unwrap_or_else(|| NormalizedCurie::identity(curie))
        };

        let mut records = Vec::new();
        for (operation, rows) in responses {
            for row in rows {
                let mut record = Record {
                    subject: RecordNode {
                        normalized: lookup(&row.subject),
                        original: row.subject,
                        category: Some(operation.association.input_type.clone()),
                    },
                    object: RecordNode {
                        normalized: lookup(&row.object),
                        original: row.object,
                        category: Some(operation.association.output_type.clone()),
                    },
                    predicate: operation.association.predicate.clone(),
                    api_name: operation.association.api_name.clone(),
                    source: operation
                        .source
                        .clone()
                        .unwrap_or_else(|| format!("infores:{}", operation.smartapi.id)),
                    api_is_trapi: operation.is_trapi,
                    publications: row.publications,
                    attributes: row.attributes,
                    is_set: row.is_set,
                    hash: String::new(),
                    qedge_id: Some(query.qedge_id.clone()),
                };
                record.hash = record.compute_fingerprint(&self.core.record_identity_fields);
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl BatchEdgeHandler for ApiBatchHandler {
    async fn fetch_records(&self, query: &EdgeQuery, log: &QueryLog) -> Result<Vec<Record>> {
        let key = self.cache_key(query);

        match self.cache.lookup(&key, &query.qedge_id).await {
            Ok(Some(records)) => {
                log.info(format!(
                    "cacheHit: edge {} served {} records from cache",
                    query.qedge_id,
                    records.len()
                ));
                return Ok(records);
            }
            Ok(None) => {}
            Err(e) => {
                // Cache trouble is never fatal; re-fetch from the APIs.
                debug!(error = %e, "cache lookup failed, proceeding as miss");
            }
        }

        let operations = self.registry.operations_for(
            &query.subject_categories,
            &query.predicates,
            &query.object_categories,
        );
        if operations.is_empty() {
            log.warn(format!(
                "edge {} matches no MetaKG operation",
                query.qedge_id
            ));
            return Ok(Vec::new());
        }
        debug!(
            edge = %query.qedge_id,
            operations = operations.len(),
            curies = query.input_curies.len(),
            "expanding edge into sub-queries"
        );

        let responses = self.fan_out(&operations, query, log).await;
        let records = self.build_records(query, responses).await?;

        if !records.is_empty() {
            if let Err(e) = self.cache.store(&key, &records).await {
                warn!(error = %e, "cache store failed");
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metakg::OperationRegistry;
    use medgraph_cache::{CacheHandler, MemoryBackend, DEFAULT_TTL};
    use medgraph_core::{Association, PassthroughResolver, SmartApi};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn operation(api_id: &str) -> MetaOperation {
        MetaOperation {
            association: Association {
                input_type: "biolink:Gene".into(),
                output_type: "biolink:Disease".into(),
                predicate: "biolink:related_to".into(),
                api_name: format!("{api_id} API"),
            },
            smartapi: SmartApi {
                id: api_id.to_string(),
                url: format!("https://{api_id}.example.org/query"),
            },
            is_trapi: false,
            source: None,
        }
    }

    /// Scripted transport counting outbound calls.
    struct CountingTransport {
        calls: AtomicUsize,
        fail_apis: Vec<String>,
    }

    impl CountingTransport {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_apis: Vec::new(),
            }
        }

        fn failing(apis: &[&str]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_apis: apis.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl SubqueryTransport for CountingTransport {
        async fn call(
            &self,
            operation: &MetaOperation,
            curies: &[String],
        ) -> Result<Vec<SubqueryRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_apis.contains(&operation.association.api_name) {
                return Err(MedgraphError::downstream(
                    &operation.association.api_name,
                    "connection timed out",
                ));
            }
            Ok(curies
                .iter()
                .map(|curie| SubqueryRow {
                    subject: curie.clone(),
                    object: "MONDO:0011122".into(),
                    publications: Vec::new(),
                    is_set: false,
                    attributes: BTreeMap::new(),
                })
                .collect())
        }
    }

    fn edge_query() -> EdgeQuery {
        EdgeQuery {
            qedge_id: "e01".into(),
            subject_categories: vec!["biolink:Gene".into()],
            predicates: vec!["biolink:related_to".into()],
            object_categories: vec!["biolink:Disease".into()],
            input_curies: vec!["NCBIGene:3778".into()],
            reversed: false,
        }
    }

    fn handler(transport: Arc<CountingTransport>, cache: Arc<CacheHandler>) -> ApiBatchHandler {
        ApiBatchHandler::new(
            Arc::new(OperationRegistry::new(vec![operation("a"), operation("b")])),
            transport,
            Arc::new(PassthroughResolver),
            cache,
            CoreConfig::default(),
            4,
        )
    }

    #[tokio::test]
    async fn test_fan_out_builds_records_per_api() {
        let transport = Arc::new(CountingTransport::new());
        let handler = handler(transport.clone(), Arc::new(CacheHandler::disabled()));

        let log = QueryLog::new();
        let records = handler.fetch_records(&edge_query(), &log).await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.hash.is_empty()));
        assert!(records.iter().all(|r| r.qedge_id.as_deref() == Some("e01")));
        // Same triple from two APIs keeps distinct hashes: api is
        // identity-bearing by default.
        assert_ne!(records[0].hash, records[1].hash);
    }

    #[tokio::test]
    async fn test_second_fetch_is_cache_hit() {
        let transport = Arc::new(CountingTransport::new());
        let cache = Arc::new(CacheHandler::new(Arc::new(MemoryBackend::new()), DEFAULT_TTL));
        let handler = handler(transport.clone(), cache);

        let log = QueryLog::new();
        let first = handler.fetch_records(&edge_query(), &log).await.unwrap();
        let second = handler.fetch_records(&edge_query(), &log).await.unwrap();

        assert_eq!(
            transport.calls.load(Ordering::SeqCst),
            2,
            "second fetch issues zero outbound calls"
        );
        assert_eq!(first.len(), second.len());
        assert!(log
            .entries()
            .iter()
            .any(|entry| entry.message.contains("cacheHit")));
    }

    #[tokio::test]
    async fn test_failing_api_isolated() {
        let transport = Arc::new(CountingTransport::failing(&["a API"]));
        let handler = handler(transport, Arc::new(CacheHandler::disabled()));

        let log = QueryLog::new();
        let records = handler.fetch_records(&edge_query(), &log).await.unwrap();

        assert_eq!(records.len(), 1, "the healthy API still contributes");
        let tallies = log.tallies();
        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies[0].1.failure, 1);
        assert_eq!(tallies[1].1.success, 1);
    }

    #[tokio::test]
    async fn test_unknown_triple_yields_no_records() {
        let transport = Arc::new(CountingTransport::new());
        let handler = handler(transport.clone(), Arc::new(CacheHandler::disabled()));

        let mut query = edge_query();
        query.predicates = vec!["biolink:treats".into()];
        let log = QueryLog::new();
        let records = handler.fetch_records(&query, &log).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(log
            .entries()
            .iter()
            .any(|entry| entry.message.contains("no MetaKG operation")));
    }
}
