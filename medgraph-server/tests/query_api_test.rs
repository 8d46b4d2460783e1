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

//! Integration tests for the TRAPI endpoint over a real listener.

use medgraph_server::config::ServerConfig;
use medgraph_server::{build_router, build_state};
use serde_json::{json, Value};

async fn spawn_server() -> String {
    let config = ServerConfig::default();
    let state = build_state(&config).unwrap();
    let router = build_router(state, false);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_invalid_query_graph_returns_400_with_stable_name() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    // e01 references a node id that does not exist.
    let body = json!({
        "message": {
            "query_graph": {
                "nodes": {
                    "n1": {"ids": ["NCBIGene:3778"], "categories": ["biolink:Gene"]}
                },
                "edges": {
                    "e01": {"subject": "n1", "object": "n9"}
                }
            }
        }
    });

    let response = client
        .post(format!("{base}/v1/query"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let payload: Value = response.json().await.unwrap();
    assert_eq!(payload["name"], "InvalidQueryGraph");
    assert!(payload["error"].as_str().unwrap().contains("n9"));
}

#[tokio::test]
async fn test_empty_catalog_yields_empty_response_not_error() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let body = json!({
        "message": {
            "query_graph": {
                "nodes": {
                    "n1": {"ids": ["NCBIGene:3778"], "categories": ["biolink:Gene"]},
                    "n2": {"categories": ["biolink:Disease"]}
                },
                "edges": {
                    "e01": {"subject": "n1", "object": "n2", "predicates": ["biolink:related_to"]}
                }
            }
        }
    });

    let response = client
        .post(format!("{base}/v1/query"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let payload: Value = response.json().await.unwrap();
    assert_eq!(payload["workflow"][0]["id"], "lookup");
    assert_eq!(payload["message"]["results"].as_array().unwrap().len(), 0);
    // The query graph is echoed back.
    assert_eq!(
        payload["message"]["query_graph"]["edges"]["e01"]["subject"],
        "n1"
    );
    // The dead edge shows up in the response logs.
    let logs = payload["logs"].as_array().unwrap();
    assert!(logs.iter().any(|entry| entry["message"]
        .as_str()
        .unwrap()
        .contains("no MetaKG operation")));
}

#[tokio::test]
async fn test_health_reports_catalog_size() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let payload: Value = response.json().await.unwrap();
    assert_eq!(payload["status"], "healthy");
    assert_eq!(payload["metakg_operations"], 0);
}
