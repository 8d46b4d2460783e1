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

//! Knowledge-graph builder.
//!
//! Subscribes to the execution-edge store and aggregates executed records
//! into TRAPI knowledge-graph nodes and edges: one node per distinct curie,
//! merging equivalent curies and labels; one edge per distinct record hash,
//! merging provenance. Attribute shape depends on the source class. A prune
//! pass drops everything the assembled results never reference.

use crate::manager::EdgeObserver;
use crate::xedge::QXEdge;
use dashmap::DashMap;
use medgraph_core::{CoreConfig, QueryGraph, Record, TrapiKnowledgeGraph, TrapiResult};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// Aggregator infores curie stamped on non-curated, non-TRAPI records.
const AGGREGATOR_SOURCE: &str = "infores:medgraph";

#[derive(Debug, Clone)]
pub struct KgNode {
    pub primary: String,
    pub category: String,
    pub label: Option<String>,
    pub equivalent_curies: BTreeSet<String>,
    pub names: BTreeSet<String>,
    /// Query nodes this curie appeared on as a record subject.
    pub source_qnodes: BTreeSet<String>,
    /// Query nodes this curie appeared on as a record object.
    pub target_qnodes: BTreeSet<String>,
    /// Per-API attribute bags merged from records touching this curie.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct KgEdge {
    pub predicate: String,
    pub subject: String,
    pub object: String,
    pub api_names: BTreeSet<String>,
    pub sources: BTreeSet<String>,
    pub publications: BTreeSet<String>,
    /// One shaped attribute bag per contributing API.
    pub attributes: Vec<serde_json::Value>,
}

pub struct KnowledgeGraphBuilder {
    nodes: DashMap<String, KgNode>,
    edges: DashMap<String, KgEdge>,
    config: CoreConfig,
}

impl KnowledgeGraphBuilder {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            nodes: DashMap::new(),
            edges: DashMap::new(),
            config,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn upsert_node(&self, record_node: &medgraph_core::RecordNode, qnode: &str, as_subject: bool) {
        let normalized = &record_node.normalized;
        let mut entry = self
            .nodes
            .entry(normalized.primary.clone())
            .or_insert_with(|| KgNode {
                primary: normalized.primary.clone(),
                category: record_node
                    .category
                    .clone()
                    .unwrap_or_else(|| "biolink:NamedThing".to_string()),
                label: None,
                equivalent_curies: BTreeSet::new(),
                names: BTreeSet::new(),
                source_qnodes: BTreeSet::new(),
                target_qnodes: BTreeSet::new(),
                attributes: BTreeMap::new(),
            });

        if entry.label.is_none() {
            entry.label = normalized.label.clone();
        }
        if let Some(label) = &normalized.label {
            entry.names.insert(label.clone());
        }
        entry
            .equivalent_curies
            .extend(normalized.equivalent_curies.iter().cloned());
        entry.equivalent_curies.insert(record_node.original.clone());
        if as_subject {
            entry.source_qnodes.insert(qnode.to_string());
        } else {
            entry.target_qnodes.insert(qnode.to_string());
        }
    }

    fn upsert_edge(&self, record: &Record) {
        let mut entry = self
            .edges
            .entry(record.hash.clone())
            .or_insert_with(|| KgEdge {
                predicate: record.predicate.clone(),
                subject: record.subject.curie().to_string(),
                object: record.object.curie().to_string(),
                api_names: BTreeSet::new(),
                sources: BTreeSet::new(),
                publications: BTreeSet::new(),
                attributes: Vec::new(),
            });

        entry.sources.insert(record.source.clone());
        entry
            .publications
            .extend(record.publications.iter().cloned());
        if entry.api_names.insert(record.api_name.clone()) {
            let shaped = self.shape_attributes(record);
            entry.attributes.push(shaped);
        }
    }

    /// TRAPI-native sources pass their attributes through; curated direct
    /// sources are promoted to primary + supporting; everything else is
    /// primary + aggregator.
    fn shape_attributes(&self, record: &Record) -> serde_json::Value {
        if record.api_is_trapi {
            return json!({
                "attribute_source": record.api_name,
                "attributes": record.attributes,
            });
        }
        if self.config.is_curated_source(&record.api_name) {
            return json!({
                "attribute_source": record.api_name,
                "attributes": [
                    {
                        "attribute_type_id": "biolink:primary_knowledge_source",
                        "value": record.source,
                    },
                    {
                        "attribute_type_id": "biolink:supporting_data_source",
                        "value": record.api_name,
                    },
                ],
            });
        }
        json!({
            "attribute_source": record.api_name,
            "attributes": [
                {
                    "attribute_type_id": "biolink:primary_knowledge_source",
                    "value": record.source,
                },
                {
                    "attribute_type_id": "biolink:aggregator_knowledge_source",
                    "value": AGGREGATOR_SOURCE,
                },
            ],
        })
    }

    /// Drop every node and edge the assembled results never reference.
    pub fn prune(&self, results: &[TrapiResult]) {
        let mut live_curies: BTreeSet<&str> = BTreeSet::new();
        let mut live_hashes: BTreeSet<&str> = BTreeSet::new();
        for result in results {
            for bindings in result.node_bindings.values() {
                live_curies.extend(bindings.iter().map(|b| b.id.as_str()));
            }
            for bindings in result.edge_bindings.values() {
                live_hashes.extend(bindings.iter().map(|b| b.id.as_str()));
            }
        }
        self.nodes.retain(|curie, _| live_curies.contains(curie.as_str()));
        self.edges.retain(|hash, _| live_hashes.contains(hash.as_str()));
    }

    pub fn to_trapi(&self) -> TrapiKnowledgeGraph {
        let mut kg = TrapiKnowledgeGraph::default();
        for entry in self.nodes.iter() {
            let node = entry.value();
            let mut attributes = vec![
                json!({
                    "attribute_type_id": "biolink:xref",
                    "value": node.equivalent_curies,
                }),
                json!({
                    "attribute_type_id": "biolink:synonym",
                    "value": node.names,
                }),
            ];
            attributes.extend(node.attributes.iter().map(|(api, bag)| {
                json!({
                    "attribute_source": api,
                    "attributes": bag,
                })
            }));
            kg.nodes.insert(
                node.primary.clone(),
                json!({
                    "name": node.label,
                    "categories": [node.category],
                    "attributes": attributes,
                }),
            );
        }
        for entry in self.edges.iter() {
            let edge = entry.value();
            kg.edges.insert(
                entry.key().clone(),
                json!({
                    "predicate": edge.predicate,
                    "subject": edge.subject,
                    "object": edge.object,
                    "sources": edge.sources,
                    "publications": edge.publications,
                    "attributes": edge.attributes,
                }),
            );
        }
        kg
    }
}

impl EdgeObserver for KnowledgeGraphBuilder {
    fn on_records_stored(&self, graph: &QueryGraph, xedge: &QXEdge) {
        let input_qnode = &graph.node(xedge.input_node(graph)).id;
        let output_qnode = &graph.node(xedge.output_node(graph)).id;
        for record in &xedge.records {
            self.upsert_node(&record.subject, input_qnode, true);
            self.upsert_node(&record.object, output_qnode, false);
            self.upsert_edge(record);
            if !record.attributes.is_empty() {
                for curie in [record.subject.curie(), record.object.curie()] {
                    if let Some(mut node) = self.nodes.get_mut(curie) {
                        node.attributes
                            .entry(record.api_name.clone())
                            .or_insert_with(|| json!(record.attributes));
                    }
                }
            }
        }
    }
}
