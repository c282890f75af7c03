// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Settings round-trips, token masking, and the runner connectivity probe

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use wb_rest_server::state::AppState;
use wb_rest_server::{Server, ServerConfig};

async fn spawn_server(config: ServerConfig) -> String {
    let state = AppState::new(config.clone()).await.expect("state");
    let server = Server::with_state(config, state);
    let app = server.app();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/api")
}

#[tokio::test]
async fn settings_round_trip_masks_the_token() {
    let base = spawn_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{base}/settings/runner"))
        .json(&json!({"runnerUrl": "https://x", "runnerToken": "super-secret"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["runnerUrl"], json!("https://x"));
    assert_eq!(body["data"]["runnerToken"], json!("***"));

    let body: Value = client
        .get(format!("{base}/settings/runner"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["runnerUrl"], json!("https://x"));
    assert_eq!(body["data"]["runnerToken"], json!("***"));
    assert!(body["data"]["updatedAt"].as_str().is_some());
}

#[tokio::test]
async fn empty_string_clears_the_url_to_null() {
    let base = spawn_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    client
        .put(format!("{base}/settings/runner"))
        .json(&json!({"runnerUrl": "https://x"}))
        .send()
        .await
        .unwrap();
    client
        .put(format!("{base}/settings/runner"))
        .json(&json!({"runnerUrl": ""}))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{base}/settings/runner"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["runnerUrl"], Value::Null);
}

#[tokio::test]
async fn invalid_scheme_is_rejected() {
    let base = spawn_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{base}/settings/runner"))
        .json(&json!({"runnerUrl": "not-a-url"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("http"));

    // the rejected value was not stored
    let body: Value = client
        .get(format!("{base}/settings/runner"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["runnerUrl"], Value::Null);
}

#[tokio::test]
async fn runner_test_probes_the_health_endpoint() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stub_addr = listener.local_addr().unwrap();
    let stub = Router::new().route(
        "/health",
        get(|| async { Json(json!({"status": "ok", "version": "1.0"})) }),
    );
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });

    let base = spawn_server(ServerConfig {
        runner_base_url: Some(format!("http://{stub_addr}")),
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/settings/runner/test")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["reachable"], json!(true));
    assert_eq!(body["data"]["runnerInfo"]["status"], json!("ok"));
}

#[tokio::test]
async fn runner_test_without_configuration_is_500() {
    let base = spawn_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/settings/runner/test")).send().await.unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
}

#[tokio::test]
async fn runner_test_against_dead_endpoint_is_502() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let base = spawn_server(ServerConfig {
        runner_base_url: Some(format!("http://{dead_addr}")),
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/settings/runner/test")).send().await.unwrap();
    assert_eq!(resp.status(), 502);
}

#[tokio::test]
async fn health_reports_counts_and_runner_flag() {
    let base = spawn_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "t1"}))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["data"]["database"]["healthy"], json!(true));
    assert_eq!(body["data"]["database"]["tasksCount"], json!(1));
    // the create also appended its event
    assert_eq!(body["data"]["database"]["eventsCount"], json!(1));
    assert_eq!(body["data"]["runner"]["configured"], json!(false));

    client
        .put(format!("{base}/settings/runner"))
        .json(&json!({"runnerUrl": "https://runner.example.com"}))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["runner"]["configured"], json!(true));
    assert_eq!(
        body["data"]["runner"]["baseUrl"],
        json!("https://runner.example.com")
    );
}
