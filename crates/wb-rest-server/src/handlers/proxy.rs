// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Proxy endpoints forwarding to the runner
//!
//! Each handler validates its input, makes exactly one runner call, and on
//! success returns the runner's JSON body unmodified. Failures follow the
//! normalization contract of the runner client and surface as envelopes.

use crate::ServerResult;
use crate::error::ServerError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub path: Option<String>,
    pub recursive: Option<bool>,
    pub pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SandboxWriteRequest {
    pub path: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SandboxDeleteRequest {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SandboxRenameRequest {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShellRunRequest {
    pub command: Option<String>,
    pub cwd: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub files: Option<Vec<String>>,
    pub prompt: Option<String>,
    #[serde(default = "default_include_content")]
    pub include_content: bool,
}

fn default_include_content() -> bool {
    true
}

fn require<T>(value: Option<T>, message: &str) -> ServerResult<T> {
    value.ok_or_else(|| ServerError::BadRequest(message.to_string()))
}

/// GET /browse — browse any directory on the runner's system
pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> ServerResult<Json<Value>> {
    let client = state.runner_client().await?;
    let body = client
        .browse(
            query.path.as_deref(),
            query.recursive.unwrap_or(false),
            query.pattern.as_deref().filter(|p| !p.is_empty()),
        )
        .await?;
    Ok(Json(body))
}

/// GET /browse/read — read a file anywhere on the runner's system
pub async fn browse_read(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ServerResult<Json<Value>> {
    let path = require(query.path, "Missing path parameter")?;
    let client = state.runner_client().await?;
    Ok(Json(client.read_file(&path).await?))
}

/// GET /sandbox/list — list sandbox entries
pub async fn sandbox_list(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ServerResult<Json<Value>> {
    let client = state.runner_client().await?;
    Ok(Json(client.sandbox_list(query.path.as_deref().unwrap_or("")).await?))
}

/// GET /sandbox/read — read a sandbox file
pub async fn sandbox_read(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ServerResult<Json<Value>> {
    let client = state.runner_client().await?;
    Ok(Json(client.sandbox_read(query.path.as_deref().unwrap_or("")).await?))
}

/// POST /sandbox/write — write a sandbox file
pub async fn sandbox_write(
    State(state): State<AppState>,
    payload: Result<Json<SandboxWriteRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(request) =
        payload.map_err(|_| ServerError::BadRequest("Invalid JSON body".to_string()))?;
    let path = require(request.path, "Missing path parameter")?;
    let content = request.content.unwrap_or_default();
    let client = state.runner_client().await?;
    Ok(Json(client.sandbox_write(&path, &content).await?))
}

/// POST /sandbox/delete — delete a sandbox file
pub async fn sandbox_delete(
    State(state): State<AppState>,
    payload: Result<Json<SandboxDeleteRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(request) =
        payload.map_err(|_| ServerError::BadRequest("Invalid JSON body".to_string()))?;
    let path = require(request.path, "Missing path parameter")?;
    let client = state.runner_client().await?;
    Ok(Json(client.sandbox_delete(&path).await?))
}

/// POST /sandbox/rename — rename a sandbox file
pub async fn sandbox_rename(
    State(state): State<AppState>,
    payload: Result<Json<SandboxRenameRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(request) =
        payload.map_err(|_| ServerError::BadRequest("Invalid JSON body".to_string()))?;
    let from = require(request.from, "Missing from parameter")?;
    let to = require(request.to, "Missing to parameter")?;
    let client = state.runner_client().await?;
    Ok(Json(client.sandbox_rename(&from, &to).await?))
}

/// POST /shell/run — execute a shell command on the runner machine
pub async fn shell_run(
    State(state): State<AppState>,
    payload: Result<Json<ShellRunRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(request) =
        payload.map_err(|_| ServerError::BadRequest("Invalid JSON body".to_string()))?;
    let command = require(
        request.command.filter(|c| !c.is_empty()),
        "Missing command parameter",
    )?;
    tracing::debug!(%command, admin = request.admin, "proxying shell command");
    let client = state.runner_client().await?;
    Ok(Json(
        client.shell(&command, request.cwd.as_deref(), request.admin).await?,
    ))
}

/// POST /analyze — send files to the runner's LLM for code analysis
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(request) =
        payload.map_err(|_| ServerError::BadRequest("Invalid JSON body".to_string()))?;
    let files = require(
        request.files.filter(|files| !files.is_empty()),
        "Files array is required",
    )?;
    let prompt = require(
        request.prompt.filter(|p| !p.is_empty()),
        "Prompt is required",
    )?;
    let client = state.runner_client().await?;
    Ok(Json(
        client.analyze(&files, &prompt, request.include_content).await?,
    ))
}
