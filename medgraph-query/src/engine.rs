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

//! Query engine.
//!
//! Drives one query through the pipeline: translate the query graph, then
//! repeatedly pick the lowest-cardinality edge, fetch its records through
//! the batch handler, store, and propagate until no edge is pending, then
//! assemble the survivors into a TRAPI response. The loop is sequential by
//! design: each `next()` decision must see the entity counts updated by the
//! previous edge. Fan-out parallelism lives inside the batch handler.
//!
//! An edge coming back empty (no operations, no records, or no survivors
//! after propagation) is not an error: the loop unwinds and the engine
//! still emits a complete, empty response with its logs.

use crate::assembler;
use crate::kg::KnowledgeGraphBuilder;
use crate::manager::{EdgeManager, EdgeQuery};
use crate::plan;
use async_trait::async_trait;
use medgraph_core::{
    CoreConfig, MedgraphError, MetaKg, QueryLog, Record, Result, TrapiKnowledgeGraph,
    TrapiRequest, TrapiResponse, TrapiResponseMessage, TrapiResult, WorkflowStep,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Boundary to the HTTP fan-out. Implementations consult the cache, expand
/// the edge into concrete per-API calls, and resolve identifiers; the
/// engine treats them as opaque beyond this contract.
#[async_trait]
pub trait BatchEdgeHandler: Send + Sync {
    async fn fetch_records(&self, query: &EdgeQuery, log: &QueryLog) -> Result<Vec<Record>>;
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// When set, executed records are dumped as JSON under this directory.
    pub dump_path: Option<PathBuf>,
    /// Include the execution direction in dumps.
    pub dump_direction: bool,
}

pub struct QueryEngine {
    handler: Arc<dyn BatchEdgeHandler>,
    metakg: Arc<dyn MetaKg>,
    core: CoreConfig,
    config: EngineConfig,
}

impl QueryEngine {
    pub fn new(
        handler: Arc<dyn BatchEdgeHandler>,
        metakg: Arc<dyn MetaKg>,
        core: CoreConfig,
        config: EngineConfig,
    ) -> Self {
        Self {
            handler,
            metakg,
            core,
            config,
        }
    }

    pub async fn execute(&self, request: &TrapiRequest) -> Result<TrapiResponse> {
        let log = QueryLog::new();

        if let Some(steps) = &request.workflow {
            if let Some(step) = steps.iter().find(|s| s.id != "lookup") {
                return Err(MedgraphError::InvalidQueryGraph(format!(
                    "unsupported workflow step: {}",
                    step.id
                )));
            }
        }

        let (graph, xedges) = plan::translate(&request.message.query_graph)?;
        let mut manager = EdgeManager::new(graph, xedges);
        let kg = Arc::new(KnowledgeGraphBuilder::new(self.core.clone()));
        manager.register_observer(kg.clone());

        // Seed cardinality proxies and catch dead edges before any fetch.
        for idx in 0..manager.xedges().len() {
            let query = manager.edge_query(idx);
            let ops = self
                .metakg
                .operations_for(
                    &query.subject_categories,
                    &query.predicates,
                    &query.object_categories,
                )
                .len()
                + self
                    .metakg
                    .operations_for(
                        &query.object_categories,
                        &query.predicates,
                        &query.subject_categories,
                    )
                    .len();
            if ops == 0 {
                log.warn(format!(
                    "edge {} matches no MetaKG operation; returning empty response",
                    query.qedge_id
                ));
                return Ok(self.empty_response(request, &log));
            }
            manager.set_operation_count(idx, ops);
        }

        while manager.has_pending() {
            let idx = match manager.next() {
                Some(idx) => idx,
                None => break,
            };
            let query = manager.edge_query(idx);
            log.debug(format!(
                "executing edge {} with {} input curies",
                query.qedge_id,
                query.input_curies.len()
            ));

            let mut records = self.handler.fetch_records(&query, &log).await?;
            for record in &mut records {
                if record.hash.is_empty() {
                    record.hash = record.compute_fingerprint(&self.core.record_identity_fields);
                }
            }

            if records.is_empty() {
                log.warn(format!(
                    "edge {} returned no records; terminating with empty response",
                    query.qedge_id
                ));
                return Ok(self.empty_response(request, &log));
            }

            log.info(format!(
                "edge {} fetched {} records",
                query.qedge_id,
                records.len()
            ));
            manager.store_records(idx, records);
            manager.propagate();
            self.dump_records(&manager, idx)?;

            if manager.surviving(idx) == 0 {
                log.warn(format!(
                    "edge {} has no surviving records after propagation",
                    query.qedge_id
                ));
                return Ok(self.empty_response(request, &log));
            }
        }

        let organized = manager.organize();
        let results = assembler::assemble(manager.graph(), &organized);
        kg.prune(&results);

        self.log_summary(&log, kg.node_count(), kg.edge_count(), results.len());
        Ok(Self::response(request, kg.to_trapi(), results, &log))
    }

    fn empty_response(&self, request: &TrapiRequest, log: &QueryLog) -> TrapiResponse {
        self.log_summary(log, 0, 0, 0);
        Self::response(request, TrapiKnowledgeGraph::default(), Vec::new(), log)
    }

    fn response(
        request: &TrapiRequest,
        knowledge_graph: TrapiKnowledgeGraph,
        results: Vec<TrapiResult>,
        log: &QueryLog,
    ) -> TrapiResponse {
        TrapiResponse {
            workflow: vec![WorkflowStep::lookup()],
            message: TrapiResponseMessage {
                query_graph: request.message.query_graph.clone(),
                knowledge_graph,
                results,
            },
            logs: log.entries(),
        }
    }

    fn log_summary(&self, log: &QueryLog, nodes: usize, edges: usize, results: usize) {
        let tallies: Vec<serde_json::Value> = log
            .tallies()
            .iter()
            .map(|(api, tally)| {
                json!({"api": api, "success": tally.success, "failure": tally.failure})
            })
            .collect();
        info!(
            kg_nodes = nodes,
            kg_edges = edges,
            results,
            "query execution finished"
        );
        log.info_with_data(
            format!(
                "execution summary: {nodes} kg nodes, {edges} kg edges, {results} results"
            ),
            json!({ "apis": tallies }),
        );
    }

    fn dump_records(&self, manager: &EdgeManager, idx: usize) -> Result<()> {
        let Some(dir) = &self.config.dump_path else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let xedge = &manager.xedges()[idx];
        let mut dump = json!({
            "edge": xedge.id,
            "records": xedge.records,
        });
        if self.config.dump_direction {
            dump["reversed"] = json!(xedge.reverse);
        }
        let path = dir.join(format!("{}.json", xedge.id));
        std::fs::write(&path, serde_json::to_vec_pretty(&dump)?)?;
        warn!(path = %path.display(), "dumped edge records for debugging");
        Ok(())
    }
}
