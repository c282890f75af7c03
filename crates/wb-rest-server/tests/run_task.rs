// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Run-task orchestration over the real HTTP surface with a stub runner

use axum::routing::post;
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

async fn spawn_stub_runner(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub serve");
    });
    format!("http://{addr}")
}

async fn create_task(client: &reqwest::Client, base: &str, body: Value) -> String {
    let resp: Value = client
        .post(format!("{base}/tasks"))
        .json(&body)
        .send()
        .await
        .expect("create")
        .json()
        .await
        .expect("create body");
    resp["data"]["task"]["id"].as_str().expect("task id").to_string()
}

async fn task_events(client: &reqwest::Client, base: &str, task_id: &str) -> Vec<Value> {
    let resp: Value = client
        .get(format!("{base}/events?task_id={task_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    resp["data"]["events"].as_array().unwrap().clone()
}

#[tokio::test]
async fn completed_run_updates_task_and_returns_runner_response() {
    let runner_url = spawn_stub_runner(Router::new().route(
        "/run-task",
        post(|| async { Json(json!({"status": "completed", "output": "42"})) }),
    ))
    .await;

    let base = spawn_server(ServerConfig {
        runner_base_url: Some(runner_url),
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    let id = create_task(&client, &base, json!({"title": "t1"})).await;

    let resp = client.post(format!("{base}/tasks/{id}/run")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["data"]["task"]["status"], json!("completed"));
    assert_eq!(body["data"]["task"]["outputText"], json!("42"));
    assert!(body["data"]["task"].get("errorMessage").is_none());
    assert_eq!(body["data"]["runnerResponse"]["output"], json!("42"));
}

#[tokio::test]
async fn failed_run_answers_502_with_the_failed_task_attached() {
    let runner_url = spawn_stub_runner(Router::new().route(
        "/run-task",
        post(|| async {
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "boom"})),
            )
        }),
    ))
    .await;

    let base = spawn_server(ServerConfig {
        runner_base_url: Some(runner_url),
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    let id = create_task(&client, &base, json!({"title": "t1"})).await;

    let resp = client.post(format!("{base}/tasks/{id}/run")).send().await.unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("boom"));
    assert_eq!(body["data"]["task"]["status"], json!("failed"));
    assert!(
        body["data"]["task"]["errorMessage"].as_str().unwrap().contains("boom")
    );

    let events = task_events(&client, &base, &id).await;
    assert!(
        events.iter().any(|e| e["eventType"] == json!("task_run_failed")),
        "expected a task_run_failed event"
    );
}

#[tokio::test]
async fn unconfigured_runner_answers_500_and_leaves_status_alone() {
    let base = spawn_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let id = create_task(&client, &base, json!({"title": "t1"})).await;

    let resp = client.post(format!("{base}/tasks/{id}/run")).send().await.unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));

    let task: Value = client
        .get(format!("{base}/tasks/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(task["data"]["task"]["status"], json!("pending"));
}

#[tokio::test]
async fn run_of_unknown_task_is_404() {
    let base = spawn_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{base}/tasks/missing/run")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn settings_override_the_process_level_runner_default() {
    // the process default points at a dead port; the stored settings win
    let runner_url = spawn_stub_runner(Router::new().route(
        "/run-task",
        post(|| async { Json(json!({"status": "completed", "output": "via settings"})) }),
    ))
    .await;

    let base = spawn_server(ServerConfig {
        runner_base_url: Some("http://127.0.0.1:9".to_string()),
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    client
        .put(format!("{base}/settings/runner"))
        .json(&json!({"runnerUrl": runner_url}))
        .send()
        .await
        .unwrap();

    let id = create_task(&client, &base, json!({"title": "t1"})).await;
    let resp = client.post(format!("{base}/tasks/{id}/run")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["task"]["outputText"], json!("via settings"));
}

#[tokio::test]
async fn shell_task_scenario_leaves_the_full_event_trail() {
    let runner_url = spawn_stub_runner(Router::new().route(
        "/run-task",
        post(|Json(payload): Json<Value>| async move {
            // the dashboard forwards the task's own payload untouched
            assert_eq!(payload["payload"]["command"], json!("echo hi"));
            assert_eq!(payload["type"], json!("shell"));
            Json(json!({"status": "completed", "output": "hi\n"}))
        }),
    ))
    .await;

    let base = spawn_server(ServerConfig {
        runner_base_url: Some(runner_url),
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    let id = create_task(
        &client,
        &base,
        json!({"title": "t1", "type": "shell", "payload": {"command": "echo hi"}}),
    )
    .await;

    let resp = client.post(format!("{base}/tasks/{id}/run")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let task: Value = client
        .get(format!("{base}/tasks/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(task["data"]["task"]["outputText"], json!("hi\n"));
    assert_eq!(task["data"]["task"]["status"], json!("completed"));

    let events = task_events(&client, &base, &id).await;
    let kinds: Vec<&str> = events.iter().map(|e| e["eventType"].as_str().unwrap()).collect();
    assert_eq!(events.len(), 3);
    assert!(kinds.contains(&"task_created"));
    assert!(kinds.contains(&"task_run_started"));
    assert!(kinds.contains(&"task_run_completed"));
}
