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

//! Edge manager.
//!
//! Owns the execution edges of one query. Chooses the next edge by expected
//! cardinality, attaches fetched records, propagates curie bindings across
//! neighbors, and hands the surviving records to the assembler. Observers
//! (the knowledge-graph builder) are notified synchronously on every store.

use crate::store;
use crate::xedge::QXEdge;
use medgraph_core::{QueryGraph, Record, ENTITY_COUNT_UNKNOWN};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Synchronous subscription to record stores; no hidden global state.
pub trait EdgeObserver: Send + Sync {
    fn on_records_stored(&self, graph: &QueryGraph, xedge: &QXEdge);
}

/// One execution edge's sub-query, as handed to the batch handler.
#[derive(Debug, Clone)]
pub struct EdgeQuery {
    pub qedge_id: String,
    /// Categories of the input-side node.
    pub subject_categories: Vec<String>,
    pub predicates: Vec<String>,
    /// Categories of the output-side node.
    pub object_categories: Vec<String>,
    pub input_curies: Vec<String>,
    /// True when the edge executes against its declared direction.
    pub reversed: bool,
}

/// Surviving records of one query edge plus its connectivity, keyed for the
/// assembler by the original edge identifier.
#[derive(Debug, Clone)]
pub struct OrganizedEdge {
    pub qedge_id: String,
    /// Query-node id on the execution-input side.
    pub input_qnode: String,
    /// Query-node id on the execution-output side.
    pub output_qnode: String,
    pub records: Vec<Record>,
    /// Edge ids sharing a query node with this edge.
    pub connected_to: BTreeSet<String>,
}

pub struct EdgeManager {
    graph: QueryGraph,
    xedges: Vec<QXEdge>,
    observers: Vec<Arc<dyn EdgeObserver>>,
}

impl EdgeManager {
    pub fn new(graph: QueryGraph, xedges: Vec<QXEdge>) -> Self {
        Self {
            graph,
            xedges,
            observers: Vec::new(),
        }
    }

    pub fn register_observer(&mut self, observer: Arc<dyn EdgeObserver>) {
        self.observers.push(observer);
    }

    pub fn graph(&self) -> &QueryGraph {
        &self.graph
    }

    pub fn xedges(&self) -> &[QXEdge] {
        &self.xedges
    }

    pub fn set_operation_count(&mut self, idx: usize, count: usize) {
        self.xedges[idx].op_count = Some(count);
    }

    pub fn has_pending(&self) -> bool {
        self.xedges.iter().any(|x| !x.executed)
    }

    /// Choose the unexecuted edge with the lowest product of endpoint
    /// cardinalities; ties prefer an edge with a bound input, then the
    /// smaller edge id. The chosen edge may flip so its input side is the
    /// smaller resolved set; the direction freezes once executed.
    pub fn next(&mut self) -> Option<usize> {
        let idx = self
            .xedges
            .iter()
            .enumerate()
            .filter(|(_, x)| !x.executed)
            .min_by(|(a_idx, a), (b_idx, b)| {
                self.score(*a_idx)
                    .cmp(&self.score(*b_idx))
                    .then_with(|| self.has_bound_input(b).cmp(&self.has_bound_input(a)))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|(idx, _)| idx)?;

        self.maybe_flip(idx);
        debug!(
            edge = %self.xedges[idx].id,
            reverse = self.xedges[idx].reverse,
            score = self.score(idx),
            "selected next execution edge"
        );
        Some(idx)
    }

    fn score(&self, idx: usize) -> usize {
        let xedge = &self.xedges[idx];
        let weight = |node_idx: usize| -> usize {
            let node = self.graph.node(node_idx);
            if node.entity_count != ENTITY_COUNT_UNKNOWN {
                node.entity_count.max(1)
            } else {
                // Cardinality unknown: fall back to the MetaKG operation
                // count as a proxy.
                xedge.op_count.unwrap_or(ENTITY_COUNT_UNKNOWN).max(1)
            }
        };
        weight(xedge.input_node(&self.graph)).saturating_mul(weight(xedge.output_node(&self.graph)))
    }

    fn has_bound_input(&self, xedge: &QXEdge) -> bool {
        !self
            .graph
            .node(xedge.input_node(&self.graph))
            .bound_curies()
            .is_empty()
    }

    fn maybe_flip(&mut self, idx: usize) {
        if self.xedges[idx].executed {
            return;
        }
        let input_bound = self
            .graph
            .node(self.xedges[idx].input_node(&self.graph))
            .bound_curies();
        let output_bound = self
            .graph
            .node(self.xedges[idx].output_node(&self.graph))
            .bound_curies();

        let flip = if input_bound.is_empty() {
            !output_bound.is_empty()
        } else {
            !output_bound.is_empty() && output_bound.len() < input_bound.len()
        };
        if flip {
            self.xedges[idx].flip();
        }
    }

    /// Sub-query view of an edge at its current bindings.
    pub fn edge_query(&self, idx: usize) -> EdgeQuery {
        let xedge = &self.xedges[idx];
        let input = self.graph.node(xedge.input_node(&self.graph));
        let output = self.graph.node(xedge.output_node(&self.graph));
        EdgeQuery {
            qedge_id: xedge.id.clone(),
            subject_categories: input.categories.clone(),
            predicates: self.graph.edge(xedge.edge_idx).predicates.clone(),
            object_categories: output.categories.clone(),
            input_curies: input.bound_curies(),
            reversed: xedge.reverse,
        }
    }

    /// Attach fetched records, update resolved-curie sets and entity counts
    /// on both endpoints, and notify observers.
    pub fn store_records(&mut self, idx: usize, mut records: Vec<Record>) {
        let qedge_id = self.xedges[idx].id.clone();
        for record in &mut records {
            record.qedge_id = Some(qedge_id.clone());
        }

        let (input_node, output_node) = {
            let xedge = &self.xedges[idx];
            (
                xedge.input_node(&self.graph),
                xedge.output_node(&self.graph),
            )
        };

        let xedge = &mut self.xedges[idx];
        xedge.records = records;
        xedge.executed = true;
        xedge.refresh_bindings(&self.graph);
        let input_contribution = xedge.input_curies.clone();
        let output_contribution = xedge.output_curies.clone();

        for (node_idx, contribution) in
            [(input_node, input_contribution), (output_node, output_contribution)]
        {
            let node = self.graph.node_mut(node_idx);
            if node.resolved_curies.is_empty() {
                node.resolved_curies = contribution;
            } else {
                node.resolved_curies = node
                    .resolved_curies
                    .intersection(&contribution)
                    .cloned()
                    .collect();
            }
            node.entity_count = node.resolved_curies.len();
        }

        debug!(
            edge = %self.xedges[idx].id,
            records = self.xedges[idx].records.len(),
            "stored records"
        );
        for observer in &self.observers {
            observer.on_records_stored(&self.graph, &self.xedges[idx]);
        }
    }

    /// Run constraint propagation across all executed edges.
    pub fn propagate(&mut self) {
        store::propagate(&mut self.graph, &mut self.xedges);
    }

    /// Surviving record count on an edge.
    pub fn surviving(&self, idx: usize) -> usize {
        self.xedges[idx].records.len()
    }

    /// Surviving records keyed by original query-edge id, with connectivity
    /// derived from shared query nodes.
    pub fn organize(&self) -> BTreeMap<String, OrganizedEdge> {
        let mut organized = BTreeMap::new();
        for xedge in self.xedges.iter().filter(|x| x.executed) {
            let edge = self.graph.edge(xedge.edge_idx);
            let connected_to: BTreeSet<String> = self
                .xedges
                .iter()
                .filter(|other| other.edge_idx != xedge.edge_idx)
                .filter(|other| {
                    let other_edge = self.graph.edge(other.edge_idx);
                    other_edge.touches(edge.subject) || other_edge.touches(edge.object)
                })
                .map(|other| other.id.clone())
                .collect();

            organized.insert(
                xedge.id.clone(),
                OrganizedEdge {
                    qedge_id: xedge.id.clone(),
                    input_qnode: self.graph.node(xedge.input_node(&self.graph)).id.clone(),
                    output_qnode: self.graph.node(xedge.output_node(&self.graph)).id.clone(),
                    records: xedge.records.clone(),
                    connected_to,
                },
            );
        }
        organized
    }
}
