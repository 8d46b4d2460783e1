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

//! Medgraph Query
//!
//! The query-execution pipeline: plan translation, edge management with
//! constraint propagation, result assembly, and knowledge-graph building.

pub mod assembler;
pub mod engine;
pub mod kg;
pub mod manager;
pub mod plan;
pub mod store;
pub mod xedge;

pub use engine::{BatchEdgeHandler, EngineConfig, QueryEngine};
pub use kg::{KgEdge, KgNode, KnowledgeGraphBuilder};
pub use manager::{EdgeManager, EdgeObserver, EdgeQuery, OrganizedEdge};
pub use xedge::QXEdge;
