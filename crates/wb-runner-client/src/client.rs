// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Runner client implementation

use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::{RunnerClientError, RunnerClientResult};
use wb_api_contract::Task;

/// User agent attached to every outbound runner request
pub const USER_AGENT: &str = "workbench/1.0";

/// Header that suppresses tunnel-service interstitial warning pages
const TUNNEL_SKIP_HEADER: &str = "ngrok-skip-browser-warning";

/// Header carrying the optional runner auth token
const TOKEN_HEADER: &str = "x-runner-token";

/// Timeout for health probes
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for browse/list/read and sandbox file operations
pub const FILE_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for task execution, shell commands, and analysis
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(30);
/// Extended timeout for shell commands flagged as admin
pub const ADMIN_EXEC_TIMEOUT: Duration = Duration::from_secs(120);

/// Resolved runner endpoint configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub base_url: Url,
    pub token: Option<String>,
}

impl RunnerConfig {
    /// Resolve the effective runner endpoint: stored settings override the
    /// process-level defaults. Fails without any network attempt when
    /// neither yields a base URL.
    pub fn resolve(
        settings_url: Option<&str>,
        settings_token: Option<&str>,
        default_url: Option<&str>,
        default_token: Option<&str>,
    ) -> RunnerClientResult<Self> {
        let raw_url = settings_url
            .or(default_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(RunnerClientError::not_configured)?;

        let base_url = Url::parse(raw_url).map_err(|err| {
            RunnerClientError::NotConfigured(format!("Invalid runner URL '{raw_url}': {err}"))
        })?;

        let token = settings_token.or(default_token).filter(|t| !t.is_empty());

        Ok(Self {
            base_url,
            token: token.map(|t| t.to_string()),
        })
    }
}

/// Payload posted to the runner's `/run-task` endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerTaskPayload {
    pub task_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub metadata: RunnerTaskMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerTaskMetadata {
    pub tags: Vec<String>,
    pub status: String,
}

impl From<&Task> for RunnerTaskPayload {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            task_type: task.task_type.clone(),
            payload: task.payload.clone(),
            created_at: task.created_at,
            metadata: RunnerTaskMetadata {
                tags: task.tags.clone(),
                status: task.status.to_string(),
            },
        }
    }
}

/// HTTP client for one resolved runner endpoint
#[derive(Debug, Clone)]
pub struct RunnerClient {
    http_client: HttpClient,
    base_url: Url,
    token: Option<String>,
}

impl RunnerClient {
    /// Create a client for the given endpoint
    pub fn new(config: RunnerConfig) -> Self {
        let http_client = HttpClient::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            base_url: config.base_url,
            token: config.token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Probe the runner's health endpoint
    pub async fn health(&self) -> RunnerClientResult<Value> {
        self.request(Method::GET, "health", &[], None, HEALTH_TIMEOUT).await
    }

    /// Execute a task on the runner
    pub async fn run_task(&self, payload: &RunnerTaskPayload) -> RunnerClientResult<Value> {
        let body = serde_json::to_value(payload)
            .map_err(|err| RunnerClientError::InvalidResponse(err.to_string()))?;
        self.request(Method::POST, "run-task", &[], Some(body), EXEC_TIMEOUT).await
    }

    /// Browse a directory on the runner's system
    pub async fn browse(
        &self,
        path: Option<&str>,
        recursive: bool,
        pattern: Option<&str>,
    ) -> RunnerClientResult<Value> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(path) = path {
            query.push(("path", path.to_string()));
        }
        if recursive {
            query.push(("recursive", "true".to_string()));
        }
        if let Some(pattern) = pattern {
            query.push(("pattern", pattern.to_string()));
        }
        self.request(Method::GET, "browse", &query, None, FILE_TIMEOUT).await
    }

    /// Read a file anywhere on the runner's system
    pub async fn read_file(&self, path: &str) -> RunnerClientResult<Value> {
        let query = [("path", path.to_string())];
        self.request(Method::GET, "browse/read", &query, None, FILE_TIMEOUT).await
    }

    /// List sandbox entries
    pub async fn sandbox_list(&self, path: &str) -> RunnerClientResult<Value> {
        let query = [("path", path.to_string())];
        self.request(Method::GET, "sandbox/list", &query, None, FILE_TIMEOUT).await
    }

    /// Read a sandbox file
    pub async fn sandbox_read(&self, path: &str) -> RunnerClientResult<Value> {
        let query = [("path", path.to_string())];
        self.request(Method::GET, "sandbox/read", &query, None, FILE_TIMEOUT).await
    }

    /// Write a sandbox file
    pub async fn sandbox_write(&self, path: &str, content: &str) -> RunnerClientResult<Value> {
        let body = serde_json::json!({ "path": path, "content": content });
        self.request(Method::POST, "sandbox/write", &[], Some(body), FILE_TIMEOUT).await
    }

    /// Delete a sandbox file
    pub async fn sandbox_delete(&self, path: &str) -> RunnerClientResult<Value> {
        let body = serde_json::json!({ "path": path });
        self.request(Method::POST, "sandbox/delete", &[], Some(body), FILE_TIMEOUT).await
    }

    /// Rename a sandbox file
    pub async fn sandbox_rename(&self, from: &str, to: &str) -> RunnerClientResult<Value> {
        let body = serde_json::json!({ "from": from, "to": to });
        self.request(Method::POST, "sandbox/rename", &[], Some(body), FILE_TIMEOUT).await
    }

    /// Execute a shell command on the runner machine
    pub async fn shell(
        &self,
        command: &str,
        cwd: Option<&str>,
        admin: bool,
    ) -> RunnerClientResult<Value> {
        let body = serde_json::json!({ "command": command, "cwd": cwd });
        let timeout = if admin { ADMIN_EXEC_TIMEOUT } else { EXEC_TIMEOUT };
        self.request(Method::POST, "shell", &[], Some(body), timeout).await
    }

    /// Send files to the runner's LLM for code analysis
    pub async fn analyze(
        &self,
        files: &[String],
        prompt: &str,
        include_content: bool,
    ) -> RunnerClientResult<Value> {
        let body = serde_json::json!({
            "files": files,
            "prompt": prompt,
            "include_content": include_content,
        });
        self.request(Method::POST, "analyze", &[], Some(body), EXEC_TIMEOUT).await
    }

    // Private helper methods

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
        timeout: Duration,
    ) -> RunnerClientResult<Value> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "calling runner");

        let mut request = self
            .http_client
            .request(method, &url)
            .timeout(timeout)
            .header(TUNNEL_SKIP_HEADER, "true");

        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                RunnerClientError::Unreachable(format!(
                    "request to {url} timed out after {}s",
                    timeout.as_secs()
                ))
            } else {
                RunnerClientError::Unreachable(err.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| RunnerClientError::Unreachable(err.to_string()))?;

        interpret_response(status, &text)
    }
}

/// Normalize a raw runner response into the tagged result contract.
fn interpret_response(status: StatusCode, text: &str) -> RunnerClientResult<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(body) => {
            if !status.is_success() {
                let message = body
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        format!("Runner returned status {}: {}", status.as_u16(), snippet(text))
                    });
                return Err(RunnerClientError::Runner(message));
            }
            if body.get("ok").and_then(Value::as_bool) == Some(false) {
                let message = body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("Runner reported failure")
                    .to_string();
                return Err(RunnerClientError::Runner(message));
            }
            Ok(body)
        }
        Err(_) => {
            if !status.is_success() {
                return Err(RunnerClientError::Runner(format!(
                    "Runner returned status {}: {}",
                    status.as_u16(),
                    snippet(text)
                )));
            }
            if looks_like_html(text) {
                return Err(RunnerClientError::InvalidResponse(
                    "Runner returned an HTML page instead of JSON. Likely causes: the tunnel \
                     URL expired, the runner is not running, or the URL is wrong."
                        .to_string(),
                ));
            }
            Err(RunnerClientError::InvalidResponse(format!(
                "Runner returned invalid JSON: {}",
                snippet(text)
            )))
        }
    }
}

/// Detect tunnel-service interstitials and other HTML error pages.
fn looks_like_html(text: &str) -> bool {
    let trimmed = text.trim_start();
    let lowered = trimmed.get(..256).unwrap_or(trimmed).to_ascii_lowercase();
    lowered.starts_with("<!doctype") || lowered.starts_with("<html") || lowered.contains("ngrok")
}

fn snippet(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(200)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    &text[..end]
}
