// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Task management endpoints

use crate::ServerResult;
use crate::error::ServerError;
use crate::executor::{self, RunOutcome};
use crate::models::DataStore;
use crate::services::TaskService;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use wb_api_contract::*;

/// List tasks with optional filtering
pub async fn list_tasks(
    State(state): State<AppState>,
    filters: Result<Query<TaskFilterQuery>, QueryRejection>,
) -> ServerResult<Json<Envelope<TaskListData>>> {
    let Query(filters) =
        filters.map_err(|_| ServerError::BadRequest("Invalid query parameters".to_string()))?;
    let tasks = state.store.list_tasks(&filters).await?;
    let count = tasks.len();
    Ok(Json(Envelope::ok(TaskListData { tasks, count })))
}

/// Create a new task
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ServerResult<Json<Envelope<TaskData>>> {
    let Json(request) =
        payload.map_err(|_| ServerError::BadRequest("Invalid JSON body".to_string()))?;
    let task = TaskService::new(state.store.clone()).create(&request).await?;
    Ok(Json(Envelope::ok(TaskData { task })))
}

/// Get a specific task
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ServerResult<Json<Envelope<TaskData>>> {
    let task = state
        .store
        .get_task(&task_id)
        .await?
        .ok_or(ServerError::TaskNotFound(task_id))?;
    Ok(Json(Envelope::ok(TaskData { task })))
}

/// Partially update a task; the id is immutable
pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> ServerResult<Json<Envelope<TaskData>>> {
    let Json(patch) =
        payload.map_err(|_| ServerError::BadRequest("Invalid JSON body".to_string()))?;
    let task = TaskService::new(state.store.clone()).update(&task_id, &patch).await?;
    Ok(Json(Envelope::ok(TaskData { task })))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ServerResult<Json<Envelope<DeleteTaskData>>> {
    TaskService::new(state.store.clone()).delete(&task_id).await?;
    Ok(Json(Envelope::ok(DeleteTaskData {
        deleted: true,
        task_id,
    })))
}

/// Trigger the run-task flow
///
/// A runner failure during the run still answers with the updated (failed)
/// task attached to the 502 envelope.
pub async fn run_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ServerResult<(StatusCode, Json<Envelope<RunTaskData>>)> {
    match executor::run_task(&state, &task_id).await? {
        RunOutcome::Completed {
            task,
            runner_response,
        } => Ok((
            StatusCode::OK,
            Json(Envelope::ok(RunTaskData {
                task,
                runner_response: Some(runner_response),
            })),
        )),
        RunOutcome::Failed { task, error } => Ok((
            StatusCode::BAD_GATEWAY,
            Json(Envelope::error_with_data(
                format!("Runner execution failed: {error}"),
                RunTaskData {
                    task,
                    runner_response: None,
                },
            )),
        )),
    }
}
