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

//! TRAPI query endpoint.
//!
//! Only an invalid query graph surfaces to the client (HTTP 400 with a
//! stable error name). Every other failure is logged and answered with a
//! complete, empty TRAPI response.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use medgraph_core::{
    LogEntry, MedgraphError, TrapiKnowledgeGraph, TrapiRequest, TrapiResponse,
    TrapiResponseMessage, WorkflowStep,
};
use medgraph_query::QueryEngine;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::metakg::OperationRegistry;

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid query graph: {0}")]
    InvalidQueryGraph(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, name, message) = match self {
            ApiError::InvalidQueryGraph(msg) => {
                (StatusCode::BAD_REQUEST, "InvalidQueryGraph", msg)
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
        };

        (
            status,
            Json(ErrorResponse {
                name: name.to_string(),
                error: message,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    name: String,
    error: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    pub registry: Arc<OperationRegistry>,
}

/// POST /v1/query - TRAPI lookup
pub async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<TrapiRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match state.engine.execute(&request).await {
        Ok(response) => Ok(Json(response)),
        Err(MedgraphError::InvalidQueryGraph(msg)) => Err(ApiError::InvalidQueryGraph(msg)),
        Err(e) => {
            // Recoverable by contract: log and answer with an empty result
            // set rather than failing the query.
            error!(error = %e, "query execution failed, returning empty response");
            Ok(Json(empty_response(&request, &e)))
        }
    }
}

fn empty_response(request: &TrapiRequest, error: &MedgraphError) -> TrapiResponse {
    TrapiResponse {
        workflow: vec![WorkflowStep::lookup()],
        message: TrapiResponseMessage {
            query_graph: request.message.query_graph.clone(),
            knowledge_graph: TrapiKnowledgeGraph::default(),
            results: Vec::new(),
        },
        logs: vec![LogEntry {
            level: "ERROR".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            message: format!("{}: {error}", error.error_name()),
            data: None,
        }],
    }
}
