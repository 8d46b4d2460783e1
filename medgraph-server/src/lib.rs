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

//! Medgraph Server
//!
//! HTTP boundary for the federated query engine: wires the MetaKG registry,
//! cache, resolver, and batch handler into a `QueryEngine` and serves the
//! TRAPI endpoint.

pub mod api;
pub mod batch;
pub mod config;
pub mod metakg;
pub mod resolver;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{handle_query, health_check, AppState};
use batch::{ApiBatchHandler, ReqwestTransport};
use config::ServerConfig;
use medgraph_cache::{CacheHandler, MemoryBackend};
use medgraph_core::{IdResolver, PassthroughResolver};
use medgraph_query::{EngineConfig, QueryEngine};
use metakg::OperationRegistry;
use resolver::HttpResolver;

/// Assemble the application state from configuration.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let registry = match &config.metakg.catalog_path {
        Some(path) => Arc::new(OperationRegistry::from_catalog_file(path)?),
        None => {
            tracing::warn!("no MetaKG catalog configured; every edge will match zero operations");
            Arc::new(OperationRegistry::default())
        }
    };

    let resolver: Arc<dyn IdResolver> = match &config.metakg.resolver_url {
        Some(url) => Arc::new(HttpResolver::new(
            url.clone(),
            Duration::from_secs(config.outbound.call_timeout_secs),
        )?),
        None => {
            tracing::info!("no resolver endpoint configured; using identity normalization");
            Arc::new(PassthroughResolver)
        }
    };

    let cache = if config.cache.enabled() {
        tracing::info!(
            host = config.cache.host.as_deref().unwrap_or_default(),
            port = config.cache.port,
            ttl_secs = config.cache.key_expire_secs,
            "result caching enabled"
        );
        Arc::new(CacheHandler::new(
            Arc::new(MemoryBackend::new()),
            Duration::from_secs(config.cache.key_expire_secs),
        ))
    } else {
        tracing::info!("result caching disabled");
        Arc::new(CacheHandler::disabled())
    };

    let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(
        config.outbound.call_timeout_secs,
    ))?);
    let handler = Arc::new(ApiBatchHandler::new(
        registry.clone(),
        transport,
        resolver,
        cache,
        config.core.clone(),
        config.outbound.max_concurrency,
    ));

    let engine = Arc::new(QueryEngine::new(
        handler,
        registry.clone(),
        config.core.clone(),
        EngineConfig {
            dump_path: config.dump.path.clone(),
            dump_direction: config.dump.direction,
        },
    ));

    Ok(AppState { engine, registry })
}

/// Build the axum router over the application state.
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route("/v1/query", post(handle_query))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    router
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medgraph_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Medgraph Server");
    config.validate()?;

    let state = build_state(&config)?;
    let router = build_router(state, config.server.enable_cors);

    let addr = config.socket_addr()?;
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
