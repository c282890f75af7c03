// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Business logic services
//!
//! Task CRUD plus the domain-event trail. Handlers stay thin; stores stay
//! side-effect free; the event for each mutation is appended here.

use crate::error::{ServerError, ServerResult};
use crate::models::{DataStore, SharedStore};
use serde_json::json;
use wb_api_contract::*;

/// Task service owning CRUD with event emission
pub struct TaskService {
    store: SharedStore,
}

impl TaskService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create a task and append a `task_created` event
    pub async fn create(&self, request: &CreateTaskRequest) -> ServerResult<Task> {
        validation::validate_create_task_request(request)
            .map_err(|err| ServerError::Validation(err.to_string()))?;

        let task = self.store.create_task(request).await?;
        tracing::info!(task_id = %task.id, title = %task.title, "task created");

        self.store
            .append_event(&NewEvent::new(
                Some(task.id.clone()),
                event_types::TASK_CREATED,
                json!({ "title": task.title, "status": task.status }),
            ))
            .await?;

        Ok(task)
    }

    /// Apply a partial update and append a `task_updated` event naming the
    /// changed fields
    pub async fn update(&self, task_id: &str, patch: &TaskPatch) -> ServerResult<Task> {
        let changes = patch.changed_fields();
        let task = self
            .store
            .update_task(task_id, patch)
            .await?
            .ok_or_else(|| ServerError::TaskNotFound(task_id.to_string()))?;
        tracing::info!(task_id = %task.id, ?changes, "task updated");

        self.store
            .append_event(&NewEvent::new(
                Some(task.id.clone()),
                event_types::TASK_UPDATED,
                json!({
                    "title": task.title,
                    "status": task.status,
                    "changes": changes,
                }),
            ))
            .await?;

        Ok(task)
    }

    /// Delete a task and append a `task_deleted` event carrying its title
    pub async fn delete(&self, task_id: &str) -> ServerResult<()> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| ServerError::TaskNotFound(task_id.to_string()))?;

        if !self.store.delete_task(task_id).await? {
            return Err(ServerError::TaskNotFound(task_id.to_string()));
        }
        tracing::info!(task_id = %task_id, "task deleted");

        self.store
            .append_event(&NewEvent::new(
                Some(task_id.to_string()),
                event_types::TASK_DELETED,
                json!({ "title": task.title }),
            ))
            .await?;

        Ok(())
    }
}
