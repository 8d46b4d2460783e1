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

//! TRAPI request/response wire shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapiRequest {
    #[serde(default)]
    pub workflow: Option<Vec<WorkflowStep>>,
    pub message: TrapiRequestMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapiRequestMessage {
    pub query_graph: TrapiQueryGraph,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
}

impl WorkflowStep {
    pub fn lookup() -> Self {
        Self {
            id: "lookup".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapiQueryGraph {
    pub nodes: BTreeMap<String, TrapiQNode>,
    pub edges: BTreeMap<String, TrapiQEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapiQNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_set: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapiQEdge {
    pub subject: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicates: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapiResponse {
    pub workflow: Vec<WorkflowStep>,
    pub message: TrapiResponseMessage,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapiResponseMessage {
    /// Echo of the client's query graph.
    pub query_graph: TrapiQueryGraph,
    pub knowledge_graph: TrapiKnowledgeGraph,
    pub results: Vec<TrapiResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrapiKnowledgeGraph {
    pub nodes: BTreeMap<String, serde_json::Value>,
    pub edges: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapiResult {
    pub node_bindings: BTreeMap<String, Vec<Binding>>,
    pub edge_bindings: BTreeMap<String, Vec<Binding>>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Binding {
    pub id: String,
}

impl Binding {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: String,
    pub timestamp: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
