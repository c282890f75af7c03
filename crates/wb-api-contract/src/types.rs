//! API contract types for the Workbench REST service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Token placeholder used whenever a stored secret is echoed to a caller
pub const TOKEN_MASK: &str = "***";

/// Well-known event type tags
///
/// `eventType` stays a free-form string on the wire; these are the tags the
/// server itself emits.
pub mod event_types {
    pub const TASK_CREATED: &str = "task_created";
    pub const TASK_UPDATED: &str = "task_updated";
    pub const TASK_DELETED: &str = "task_deleted";
    pub const TASK_RUN_STARTED: &str = "task_run_started";
    pub const TASK_RUN_COMPLETED: &str = "task_run_completed";
    pub const TASK_RUN_FAILED: &str = "task_run_failed";
}

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::error::ApiContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(crate::error::ApiContractError::InvalidTaskStatus(
                other.to_string(),
            )),
        }
    }
}

/// A unit of work tracked through the four-state lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub task_type: String,
    pub payload: serde_json::Value,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    /// Raw status string as reported by the runner, distinct from `status`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
    /// Full unmodified runner response from the last run, kept for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_raw: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Task creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Deserialize an `Option<Option<T>>` field so that an explicit JSON `null`
/// becomes `Some(None)` while an absent field stays `None` (via
/// `#[serde(default)]`). Plain `Option` folds both cases together.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Partial task update
///
/// Absent field = leave unchanged; `null` = clear. There is deliberately no
/// `id` field, so a client-supplied id is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_run_at: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub runner_status: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_text: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_raw: Option<Option<serde_json::Value>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<Option<String>>,
}

impl TaskPatch {
    /// Names of the fields this patch would change, for the `task_updated`
    /// event trail.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.title.is_some() {
            changed.push("title");
        }
        if self.description.is_some() {
            changed.push("description");
        }
        if self.status.is_some() {
            changed.push("status");
        }
        if self.task_type.is_some() {
            changed.push("type");
        }
        if self.payload.is_some() {
            changed.push("payload");
        }
        if self.tags.is_some() {
            changed.push("tags");
        }
        if self.last_run_at.is_some() {
            changed.push("lastRunAt");
        }
        if self.runner_status.is_some() {
            changed.push("runnerStatus");
        }
        if self.output_text.is_some() {
            changed.push("outputText");
        }
        if self.output_raw.is_some() {
            changed.push("outputRaw");
        }
        if self.error_message.is_some() {
            changed.push("errorMessage");
        }
        changed
    }
}

/// An append-only log entry recording a state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// Event to be appended; id and timestamp are assigned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub event_type: String,
    pub data: serde_json::Value,
}

impl NewEvent {
    pub fn new(
        task_id: Option<String>,
        event_type: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            task_id,
            event_type: event_type.into(),
            data,
        }
    }
}

/// Runner configuration settings (singleton record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub runner_url: Option<String>,
    pub runner_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    /// Serialization-time view with the token replaced by a fixed mask.
    /// The stored value is never altered.
    pub fn masked(&self) -> SettingsView {
        SettingsView {
            runner_url: self.runner_url.clone(),
            runner_token: self.runner_token.as_ref().map(|_| TOKEN_MASK.to_string()),
            updated_at: self.updated_at,
        }
    }
}

/// Settings as echoed to API callers (token masked)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub runner_url: Option<String>,
    pub runner_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Partial settings update
///
/// Absent field = unchanged; empty string or `null` = clear to null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub runner_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub runner_token: Option<Option<String>>,
}

impl SettingsPatch {
    /// Fold empty strings into `None` so the stores only ever see a cleared
    /// field or a real value.
    pub fn normalized(self) -> Self {
        let squash = |field: Option<Option<String>>| {
            field.map(|inner| inner.filter(|s| !s.is_empty()))
        };
        Self {
            runner_url: squash(self.runner_url),
            runner_token: squash(self.runner_token),
        }
    }
}

/// The uniform `{ok, data|error}` JSON wrapper used by every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Failure envelope that still carries partial data, e.g. the failed
    /// task after a run attempt.
    pub fn error_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            ok: false,
            data: Some(data),
            error: Some(message.into()),
        }
    }
}

/// `GET /tasks` response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskListData {
    pub tasks: Vec<Task>,
    pub count: usize,
}

/// Single-task response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    pub task: Task,
}

/// `DELETE /tasks/:id` response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskData {
    pub deleted: bool,
    pub task_id: String,
}

/// `POST /tasks/:id/run` response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskData {
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_response: Option<serde_json::Value>,
}

/// `GET /events` response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListData {
    pub events: Vec<Event>,
    pub count: usize,
}

/// `GET /settings/runner/test` response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerTestData {
    pub reachable: bool,
    pub runner_url: String,
    pub runner_info: serde_json::Value,
}

/// Query filters for `GET /tasks`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilterQuery {
    pub limit: Option<usize>,
    pub status: Option<TaskStatus>,
    /// Accepts both `type` and the legacy `task_type` query name
    #[serde(rename = "type", alias = "task_type")]
    pub task_type: Option<String>,
    pub tag: Option<String>,
}

/// Query filters for `GET /events`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilterQuery {
    pub limit: Option<usize>,
    pub task_id: Option<String>,
    pub event_type: Option<String>,
}
