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

//! Execution edges.
//!
//! A `QXEdge` binds a query edge to an execution direction. `reverse`
//! swaps the subject/object roles: the input side is where curies flow in,
//! the output side is what the sub-query discovers. Record subjects are
//! always the input side of the sub-query that produced them; the reverse
//! flag maps them back onto query-graph nodes.

use medgraph_core::{QueryGraph, Record};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct QXEdge {
    /// Index of the wrapped edge in the query graph.
    pub edge_idx: usize,
    /// Original query-edge identifier.
    pub id: String,
    pub reverse: bool,
    /// Execution edge that seeded this edge's input node, if any.
    pub predecessor: Option<usize>,
    pub executed: bool,
    /// Number of MetaKG operations matching this edge; cardinality proxy
    /// until real counts exist.
    pub op_count: Option<usize>,
    /// Resolved curies on the input node, as last refreshed.
    pub input_curies: BTreeSet<String>,
    /// Resolved curies on the output node, as last refreshed.
    pub output_curies: BTreeSet<String>,
    pub records: Vec<Record>,
}

impl QXEdge {
    pub fn new(edge_idx: usize, id: String, reverse: bool, predecessor: Option<usize>) -> Self {
        Self {
            edge_idx,
            id,
            reverse,
            predecessor,
            executed: false,
            op_count: None,
            input_curies: BTreeSet::new(),
            output_curies: BTreeSet::new(),
            records: Vec::new(),
        }
    }

    pub fn input_node(&self, graph: &QueryGraph) -> usize {
        let edge = graph.edge(self.edge_idx);
        if self.reverse {
            edge.object
        } else {
            edge.subject
        }
    }

    pub fn output_node(&self, graph: &QueryGraph) -> usize {
        let edge = graph.edge(self.edge_idx);
        if self.reverse {
            edge.subject
        } else {
            edge.object
        }
    }

    /// Flip the execution direction. The direction is frozen once executed.
    pub fn flip(&mut self) {
        debug_assert!(!self.executed, "direction is frozen after execution");
        self.reverse = !self.reverse;
        std::mem::swap(&mut self.input_curies, &mut self.output_curies);
    }

    /// The record's curie at query-graph node `node_idx`, which must be one
    /// of this edge's endpoints.
    pub fn record_curie_at<'r>(
        &self,
        graph: &QueryGraph,
        record: &'r Record,
        node_idx: usize,
    ) -> &'r str {
        if node_idx == self.input_node(graph) {
            record.subject.curie()
        } else {
            record.object.curie()
        }
    }

    /// Curies this edge's surviving records bind at `node_idx`.
    pub fn record_curies_at(&self, graph: &QueryGraph, node_idx: usize) -> BTreeSet<String> {
        self.records
            .iter()
            .map(|r| self.record_curie_at(graph, r, node_idx).to_string())
            .collect()
    }

    /// Refresh the input/output curie views from surviving records.
    pub fn refresh_bindings(&mut self, graph: &QueryGraph) {
        if !self.executed {
            return;
        }
        self.input_curies = self.record_curies_at(graph, self.input_node(graph));
        self.output_curies = self.record_curies_at(graph, self.output_node(graph));
    }
}
