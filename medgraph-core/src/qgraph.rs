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

//! Query graph model.
//!
//! Nodes live in an arena (`Vec<QNode>`) and edges reference them by index,
//! so edges sharing a node observe each other's resolved-curie updates
//! without shared ownership. Nodes and edges are immutable after ingestion
//! except for `entity_count` and `resolved_curies`.

use crate::curie::canonical_biolink;
use crate::error::{MedgraphError, Result};
use crate::trapi::TrapiQueryGraph;
use std::collections::{BTreeSet, HashMap};

/// Sentinel for "cardinality unknown" on nodes without curies.
pub const ENTITY_COUNT_UNKNOWN: usize = usize::MAX;

#[derive(Debug, Clone)]
pub struct QNode {
    pub id: String,
    /// Biolink categories, canonicalized to the `biolink:` prefixed form.
    pub categories: Vec<String>,
    /// Concrete identifiers supplied by the client.
    pub curies: Vec<String>,
    pub is_set: bool,
    /// Estimated cardinality. Exact once all incident edges executed;
    /// an upper bound before.
    pub entity_count: usize,
    /// Curies resolved during execution.
    pub resolved_curies: BTreeSet<String>,
}

impl QNode {
    /// A node is a fixed input iff the client pinned at least one curie.
    pub fn is_fixed(&self) -> bool {
        !self.curies.is_empty()
    }

    /// The curies execution should currently bind this node to: resolved
    /// curies once any incident edge executed, the declared curies before.
    pub fn bound_curies(&self) -> Vec<String> {
        if self.resolved_curies.is_empty() {
            self.curies.clone()
        } else {
            self.resolved_curies.iter().cloned().collect()
        }
    }
}

#[derive(Debug, Clone)]
pub struct QEdge {
    pub id: String,
    /// Arena index of the subject node.
    pub subject: usize,
    /// Arena index of the object node.
    pub object: usize,
    /// Biolink predicates, canonicalized. Empty means "any predicate".
    pub predicates: Vec<String>,
}

impl QEdge {
    /// The endpoint opposite `node`.
    pub fn other_endpoint(&self, node: usize) -> usize {
        if self.subject == node {
            self.object
        } else {
            self.subject
        }
    }

    pub fn touches(&self, node: usize) -> bool {
        self.subject == node || self.object == node
    }
}

#[derive(Debug, Clone)]
pub struct QueryGraph {
    nodes: Vec<QNode>,
    edges: Vec<QEdge>,
    node_index: HashMap<String, usize>,
}

impl QueryGraph {
    /// Ingest a TRAPI query graph. Fails with `InvalidQueryGraph` when an
    /// edge references a node id that is not present, or the graph has no
    /// edges at all. Connectivity, acyclicity, and curie-presence checks
    /// belong to the plan translator, which sees the whole picture.
    pub fn from_trapi(qg: &TrapiQueryGraph) -> Result<Self> {
        if qg.edges.is_empty() {
            return Err(MedgraphError::InvalidQueryGraph(
                "query graph contains no edges".into(),
            ));
        }

        let mut nodes = Vec::with_capacity(qg.nodes.len());
        let mut node_index = HashMap::with_capacity(qg.nodes.len());
        for (id, trapi_node) in &qg.nodes {
            let curies = trapi_node.ids.clone().unwrap_or_default();
            let entity_count = if curies.is_empty() {
                ENTITY_COUNT_UNKNOWN
            } else {
                1
            };
            node_index.insert(id.clone(), nodes.len());
            nodes.push(QNode {
                id: id.clone(),
                categories: trapi_node
                    .categories
                    .clone()
                    .unwrap_or_default()
                    .iter()
                    .map(|c| canonical_biolink(c))
                    .collect(),
                curies,
                is_set: trapi_node.is_set.unwrap_or(false),
                entity_count,
                resolved_curies: BTreeSet::new(),
            });
        }

        let mut edges = Vec::with_capacity(qg.edges.len());
        for (id, trapi_edge) in &qg.edges {
            let subject = *node_index.get(&trapi_edge.subject).ok_or_else(|| {
                MedgraphError::InvalidQueryGraph(format!(
                    "edge {id} references unknown subject node {}",
                    trapi_edge.subject
                ))
            })?;
            let object = *node_index.get(&trapi_edge.object).ok_or_else(|| {
                MedgraphError::InvalidQueryGraph(format!(
                    "edge {id} references unknown object node {}",
                    trapi_edge.object
                ))
            })?;
            edges.push(QEdge {
                id: id.clone(),
                subject,
                object,
                predicates: trapi_edge
                    .predicates
                    .clone()
                    .unwrap_or_default()
                    .iter()
                    .map(|p| canonical_biolink(p))
                    .collect(),
            });
        }

        Ok(Self {
            nodes,
            edges,
            node_index,
        })
    }

    pub fn node(&self, idx: usize) -> &QNode {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut QNode {
        &mut self.nodes[idx]
    }

    pub fn node_by_id(&self, id: &str) -> Option<&QNode> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn nodes(&self) -> &[QNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [QNode] {
        &mut self.nodes
    }

    pub fn edge(&self, idx: usize) -> &QEdge {
        &self.edges[idx]
    }

    pub fn edges(&self) -> &[QEdge] {
        &self.edges
    }

    /// Indices of edges incident to `node`.
    pub fn edges_at(&self, node: usize) -> Vec<usize> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.touches(node))
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trapi::{TrapiQEdge, TrapiQNode};
    use std::collections::BTreeMap;

    fn two_hop() -> TrapiQueryGraph {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "n1".to_string(),
            TrapiQNode {
                ids: Some(vec!["NCBIGene:3778".into()]),
                categories: Some(vec!["Gene".into()]),
                is_set: None,
            },
        );
        nodes.insert(
            "n2".to_string(),
            TrapiQNode {
                ids: None,
                categories: Some(vec!["biolink:Disease".into()]),
                is_set: None,
            },
        );
        let mut edges = BTreeMap::new();
        edges.insert(
            "e01".to_string(),
            TrapiQEdge {
                subject: "n1".into(),
                object: "n2".into(),
                predicates: Some(vec!["related_to".into()]),
            },
        );
        TrapiQueryGraph { nodes, edges }
    }

    #[test]
    fn test_ingestion_canonicalizes_biolink() {
        let graph = QueryGraph::from_trapi(&two_hop()).unwrap();
        let n1 = graph.node_by_id("n1").unwrap();
        assert_eq!(n1.categories, vec!["biolink:Gene"]);
        assert_eq!(graph.edge(0).predicates, vec!["biolink:related_to"]);
    }

    #[test]
    fn test_entity_count_init() {
        let graph = QueryGraph::from_trapi(&two_hop()).unwrap();
        assert_eq!(graph.node_by_id("n1").unwrap().entity_count, 1);
        assert_eq!(
            graph.node_by_id("n2").unwrap().entity_count,
            ENTITY_COUNT_UNKNOWN
        );
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        let mut qg = two_hop();
        qg.edges.get_mut("e01").unwrap().object = "n9".into();
        let err = QueryGraph::from_trapi(&qg).unwrap_err();
        assert_eq!(err.error_name(), "InvalidQueryGraph");
    }

    #[test]
    fn test_empty_graph_rejected() {
        let qg = TrapiQueryGraph {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        };
        assert!(QueryGraph::from_trapi(&qg).is_err());
    }
}
