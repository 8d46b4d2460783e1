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

//! Medgraph Core
//!
//! Fundamental data structures for the federated knowledge-graph query
//! engine: curies, records, query graphs, TRAPI wire shapes, and the
//! boundary traits the execution pipeline consumes.

pub mod config;
pub mod curie;
pub mod error;
pub mod metakg;
pub mod qgraph;
pub mod qlog;
pub mod record;
pub mod resolver;
pub mod trapi;

pub use config::CoreConfig;
pub use error::{MedgraphError, Result};
pub use metakg::{Association, MetaKg, MetaOperation, SmartApi};
pub use qgraph::{QEdge, QNode, QueryGraph, ENTITY_COUNT_UNKNOWN};
pub use qlog::{ApiTally, QueryLog};
pub use record::{NormalizedCurie, Record, RecordNode};
pub use resolver::{IdResolver, PassthroughResolver};
pub use trapi::{
    Binding, LogEntry, TrapiKnowledgeGraph, TrapiQEdge, TrapiQNode, TrapiQueryGraph, TrapiRequest,
    TrapiRequestMessage, TrapiResponse, TrapiResponseMessage, TrapiResult, WorkflowStep,
};
