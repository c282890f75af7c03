// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Run-task execution flow
//!
//! A strict linear state machine per invocation: load, resolve the runner,
//! transition to running, call out once, then settle on completed or failed.
//! Runner failures are absorbed into persisted task state rather than
//! propagated raw; the HTTP layer attaches the updated task to its 502.

use crate::error::{ServerError, ServerResult};
use crate::models::DataStore;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use wb_api_contract::*;
use wb_runner_client::{RunnerClientError, RunnerTaskPayload, extract_output_text};

/// Per-task-id run serialization
///
/// Guards the read-modify-write cycles of two simultaneous run requests for
/// the same task within this process. A multi-instance deployment would
/// still race; that would need a storage-level version check.
pub struct RunLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn for_task(&self, task_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for RunLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Final state of one run invocation
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        task: Task,
        runner_response: Value,
    },
    Failed {
        task: Task,
        error: RunnerClientError,
    },
}

/// Execute the run-task flow for `task_id`.
///
/// `TaskNotFound` and an unconfigured runner leave the task untouched and
/// append no events; every other outcome is persisted.
pub async fn run_task(state: &AppState, task_id: &str) -> ServerResult<RunOutcome> {
    let lock = state.run_locks.for_task(task_id).await;
    let _guard = lock.lock().await;

    let task = state
        .store
        .get_task(task_id)
        .await?
        .ok_or_else(|| ServerError::TaskNotFound(task_id.to_string()))?;

    // resolve before any transition so a missing runner URL is side-effect free
    let client = state.runner_client().await?;

    let running = state
        .store
        .update_task(
            task_id,
            &TaskPatch {
                status: Some(TaskStatus::Running),
                last_run_at: Some(Some(Utc::now())),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ServerError::TaskNotFound(task_id.to_string()))?;

    state
        .store
        .append_event(&NewEvent::new(
            Some(task.id.clone()),
            event_types::TASK_RUN_STARTED,
            json!({ "runnerUrl": client.base_url().as_str() }),
        ))
        .await?;

    tracing::info!(task_id = %task.id, runner = %client.base_url(), "dispatching task to runner");

    let payload = RunnerTaskPayload::from(&running);
    match client.run_task(&payload).await {
        Ok(response) => settle_completed(state, task_id, response).await,
        Err(error) => settle_failed(state, task_id, error).await,
    }
}

async fn settle_completed(
    state: &AppState,
    task_id: &str,
    response: Value,
) -> ServerResult<RunOutcome> {
    let reported_status = response
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("completed")
        .to_string();

    // an error field or an explicit failed status is a failure outcome even
    // on a 2xx response
    let body_error = response
        .get("error")
        .filter(|value| !value.is_null())
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        });
    let failed = body_error.is_some() || reported_status == "failed";
    let status = if failed {
        TaskStatus::Failed
    } else {
        reported_status.parse().unwrap_or(TaskStatus::Completed)
    };

    let output_text = extract_output_text(&response);
    let finished_at = response
        .get("finishedAt")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(Utc::now);

    let patch = TaskPatch {
        status: Some(status),
        runner_status: Some(Some(reported_status.clone())),
        output_text: Some(output_text.clone()),
        output_raw: Some(Some(response.clone())),
        error_message: Some(body_error),
        last_run_at: Some(Some(finished_at)),
        ..Default::default()
    };
    let task = state
        .store
        .update_task(task_id, &patch)
        .await?
        .ok_or_else(|| ServerError::TaskNotFound(task_id.to_string()))?;

    state
        .store
        .append_event(&NewEvent::new(
            Some(task.id.clone()),
            event_types::TASK_RUN_COMPLETED,
            json!({
                "runnerStatus": reported_status,
                "taskStatus": task.status,
                "outputExtracted": output_text.is_some(),
            }),
        ))
        .await?;

    tracing::info!(task_id = %task.id, status = %task.status, "run settled");
    Ok(RunOutcome::Completed {
        task,
        runner_response: response,
    })
}

async fn settle_failed(
    state: &AppState,
    task_id: &str,
    error: RunnerClientError,
) -> ServerResult<RunOutcome> {
    let message = error.to_string();
    let patch = TaskPatch {
        status: Some(TaskStatus::Failed),
        runner_status: Some(Some(format!("error: {message}"))),
        output_text: Some(None),
        error_message: Some(Some(message.clone())),
        ..Default::default()
    };
    let task = state
        .store
        .update_task(task_id, &patch)
        .await?
        .ok_or_else(|| ServerError::TaskNotFound(task_id.to_string()))?;

    state
        .store
        .append_event(&NewEvent::new(
            Some(task.id.clone()),
            event_types::TASK_RUN_FAILED,
            json!({ "error": message, "kind": error.kind() }),
        ))
        .await?;

    tracing::warn!(task_id = %task.id, error = %message, "run failed");
    Ok(RunOutcome::Failed { task, error })
}
