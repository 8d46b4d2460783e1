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

//! Error types for Medgraph

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MedgraphError {
    /// The client-supplied query graph failed validation. This is the only
    /// error that surfaces to the client (HTTP 400); everything else is
    /// recovered into an empty answer.
    #[error("invalid query graph: {0}")]
    InvalidQueryGraph(String),

    #[error("identifier resolution failed: {0}")]
    Resolver(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("downstream API error: {api} - {message}")]
    Downstream { api: String, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MedgraphError>;

impl MedgraphError {
    /// Stable machine-readable name, echoed in TRAPI error payloads.
    pub fn error_name(&self) -> &'static str {
        match self {
            Self::InvalidQueryGraph(_) => "InvalidQueryGraph",
            Self::Resolver(_) => "ResolverError",
            Self::Cache(_) => "CacheError",
            Self::Downstream { .. } => "DownstreamError",
            Self::Json(_) => "JsonError",
            Self::Io(_) => "IoError",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn downstream(api: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Downstream {
            api: api.into(),
            message: message.into(),
        }
    }
}
