// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Data models and storage backends
//!
//! One `DataStore` trait carries the task, event, and settings operations;
//! the SQLite and flat-file backends are interchangeable behind it. Stores
//! never emit events — that is the service layer's job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use wb_api_contract::*;
use wb_local_db::{
    Database, EventRecord, EventStore as DbEventStore, SettingsRecord,
    SettingsStore as DbSettingsStore, TaskRecord, TaskStore as DbTaskStore,
};

/// Default page size for task listings
pub const DEFAULT_TASK_LIMIT: usize = 100;
/// Default page size for event listings
pub const DEFAULT_EVENT_LIMIT: usize = 200;

/// Storage interface shared by all backends
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn list_tasks(&self, filters: &TaskFilterQuery) -> anyhow::Result<Vec<Task>>;
    async fn get_task(&self, task_id: &str) -> anyhow::Result<Option<Task>>;
    async fn create_task(&self, request: &CreateTaskRequest) -> anyhow::Result<Task>;
    /// Returns `None` when the id is absent; a patch can never change the id.
    async fn update_task(&self, task_id: &str, patch: &TaskPatch)
        -> anyhow::Result<Option<Task>>;
    /// Returns false when the id is absent.
    async fn delete_task(&self, task_id: &str) -> anyhow::Result<bool>;

    async fn list_events(&self, filters: &EventFilterQuery) -> anyhow::Result<Vec<Event>>;
    async fn append_event(&self, event: &NewEvent) -> anyhow::Result<Event>;

    async fn get_settings(&self) -> anyhow::Result<Settings>;
    async fn update_settings(&self, patch: &SettingsPatch) -> anyhow::Result<Settings>;

    /// (tasks, events) totals for the health endpoint
    async fn counts(&self) -> anyhow::Result<(i64, i64)>;
}

/// Shared handle used throughout the server
pub type SharedStore = Arc<dyn DataStore>;

// Backend-independent task construction and mutation

fn new_task(request: &CreateTaskRequest) -> Task {
    let now = Utc::now();
    Task {
        id: uuid::Uuid::new_v4().to_string(),
        title: request.title.trim().to_string(),
        description: request.description.clone(),
        status: TaskStatus::Pending,
        task_type: request
            .task_type
            .clone()
            .unwrap_or_else(|| "general".to_string()),
        payload: request.payload.clone().unwrap_or_else(|| json!({})),
        tags: request.tags.clone().unwrap_or_default(),
        created_at: now,
        updated_at: now,
        last_run_at: None,
        runner_status: None,
        output_text: None,
        output_raw: None,
        error_message: None,
    }
}

fn apply_patch(task: &mut Task, patch: &TaskPatch) {
    if let Some(title) = &patch.title {
        task.title = title.clone();
    }
    if let Some(description) = &patch.description {
        task.description = description.clone();
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(task_type) = &patch.task_type {
        task.task_type = task_type.clone();
    }
    if let Some(payload) = &patch.payload {
        task.payload = payload.clone();
    }
    if let Some(tags) = &patch.tags {
        task.tags = tags.clone();
    }
    if let Some(last_run_at) = &patch.last_run_at {
        task.last_run_at = *last_run_at;
    }
    if let Some(runner_status) = &patch.runner_status {
        task.runner_status = runner_status.clone();
    }
    if let Some(output_text) = &patch.output_text {
        task.output_text = output_text.clone();
    }
    if let Some(output_raw) = &patch.output_raw {
        task.output_raw = output_raw.clone();
    }
    if let Some(error_message) = &patch.error_message {
        task.error_message = error_message.clone();
    }
    task.updated_at = Utc::now();
}

fn apply_settings_patch(settings: &mut Settings, patch: &SettingsPatch) {
    if let Some(runner_url) = &patch.runner_url {
        settings.runner_url = runner_url.clone();
    }
    if let Some(runner_token) = &patch.runner_token {
        settings.runner_token = runner_token.clone();
    }
    settings.updated_at = Utc::now();
}

/// Tag filter, newest-first ordering, and limit, shared by both backends.
fn filter_sort_limit(mut tasks: Vec<Task>, filters: &TaskFilterQuery) -> Vec<Task> {
    if let Some(status) = filters.status {
        tasks.retain(|task| task.status == status);
    }
    if let Some(task_type) = &filters.task_type {
        tasks.retain(|task| &task.task_type == task_type);
    }
    if let Some(tag) = &filters.tag {
        tasks.retain(|task| task.tags.iter().any(|t| t == tag));
    }
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    tasks.truncate(filters.limit.unwrap_or(DEFAULT_TASK_LIMIT));
    tasks
}

fn filter_sort_limit_events(mut events: Vec<Event>, filters: &EventFilterQuery) -> Vec<Event> {
    if let Some(task_id) = &filters.task_id {
        events.retain(|event| event.task_id.as_ref() == Some(task_id));
    }
    if let Some(event_type) = &filters.event_type {
        events.retain(|event| &event.event_type == event_type);
    }
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events.truncate(filters.limit.unwrap_or(DEFAULT_EVENT_LIMIT));
    events
}

/// Database-backed store implementation
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(Into::into)
            .unwrap_or_else(|_| Utc::now())
    }

    fn task_to_record(task: &Task) -> TaskRecord {
        TaskRecord {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.to_string(),
            task_type: task.task_type.clone(),
            payload: if task.payload.is_null() {
                None
            } else {
                Some(task.payload.to_string())
            },
            tags: if task.tags.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&task.tags).unwrap_or_else(|_| "[]".to_string()))
            },
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
            last_run_at: task.last_run_at.map(|ts| ts.to_rfc3339()),
            runner_status: task.runner_status.clone(),
            output_text: task.output_text.clone(),
            output_raw: task.output_raw.as_ref().map(|raw| raw.to_string()),
            error_message: task.error_message.clone(),
        }
    }

    fn record_to_task(record: TaskRecord) -> Task {
        Task {
            status: record.status.parse().unwrap_or(TaskStatus::Pending),
            payload: record
                .payload
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_else(|| json!({})),
            tags: record
                .tags
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default(),
            created_at: Self::parse_timestamp(&record.created_at),
            updated_at: Self::parse_timestamp(&record.updated_at),
            last_run_at: record.last_run_at.as_deref().map(Self::parse_timestamp),
            output_raw: record
                .output_raw
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            id: record.id,
            title: record.title,
            description: record.description,
            task_type: record.task_type,
            runner_status: record.runner_status,
            output_text: record.output_text,
            error_message: record.error_message,
        }
    }

    fn record_to_event(record: EventRecord) -> Event {
        Event {
            timestamp: Self::parse_timestamp(&record.timestamp),
            data: record
                .data
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or(serde_json::Value::Null),
            id: record.id,
            task_id: record.task_id,
            event_type: record.event_type,
        }
    }
}

#[async_trait]
impl DataStore for DatabaseStore {
    async fn list_tasks(&self, filters: &TaskFilterQuery) -> anyhow::Result<Vec<Task>> {
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        let store = DbTaskStore::new(&conn);
        let status = filters.status.map(|s| s.as_str());
        let records = store.list(status, filters.task_type.as_deref())?;
        let tasks = records.into_iter().map(Self::record_to_task).collect();
        Ok(filter_sort_limit(tasks, filters))
    }

    async fn get_task(&self, task_id: &str) -> anyhow::Result<Option<Task>> {
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        let store = DbTaskStore::new(&conn);
        Ok(store.get(task_id)?.map(Self::record_to_task))
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> anyhow::Result<Task> {
        let task = new_task(request);
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        DbTaskStore::new(&conn).insert(&Self::task_to_record(&task))?;
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
    ) -> anyhow::Result<Option<Task>> {
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        let store = DbTaskStore::new(&conn);
        let Some(record) = store.get(task_id)? else {
            return Ok(None);
        };
        let mut task = Self::record_to_task(record);
        apply_patch(&mut task, patch);
        store.update(&Self::task_to_record(&task))?;
        Ok(Some(task))
    }

    async fn delete_task(&self, task_id: &str) -> anyhow::Result<bool> {
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        Ok(DbTaskStore::new(&conn).delete(task_id)?)
    }

    async fn list_events(&self, filters: &EventFilterQuery) -> anyhow::Result<Vec<Event>> {
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        let store = DbEventStore::new(&conn);
        let records = store.list(
            filters.task_id.as_deref(),
            filters.event_type.as_deref(),
            Some(filters.limit.unwrap_or(DEFAULT_EVENT_LIMIT)),
        )?;
        Ok(records.into_iter().map(Self::record_to_event).collect())
    }

    async fn append_event(&self, event: &NewEvent) -> anyhow::Result<Event> {
        let stored = Event {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: event.task_id.clone(),
            event_type: event.event_type.clone(),
            timestamp: Utc::now(),
            data: event.data.clone(),
        };
        let record = EventRecord {
            id: stored.id.clone(),
            task_id: stored.task_id.clone(),
            event_type: stored.event_type.clone(),
            timestamp: stored.timestamp.to_rfc3339(),
            data: if stored.data.is_null() {
                None
            } else {
                Some(stored.data.to_string())
            },
        };
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        DbEventStore::new(&conn).insert(&record)?;
        Ok(stored)
    }

    async fn get_settings(&self) -> anyhow::Result<Settings> {
        let now = Utc::now().to_rfc3339();
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        let record = DbSettingsStore::new(&conn).get_or_init(&now)?;
        Ok(Settings {
            runner_url: record.runner_url,
            runner_token: record.runner_token,
            updated_at: Self::parse_timestamp(&record.updated_at),
        })
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> anyhow::Result<Settings> {
        let now = Utc::now().to_rfc3339();
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        let store = DbSettingsStore::new(&conn);
        let record = store.get_or_init(&now)?;
        let mut settings = Settings {
            runner_url: record.runner_url,
            runner_token: record.runner_token,
            updated_at: Self::parse_timestamp(&record.updated_at),
        };
        apply_settings_patch(&mut settings, patch);
        store.update(&SettingsRecord {
            runner_url: settings.runner_url.clone(),
            runner_token: settings.runner_token.clone(),
            updated_at: settings.updated_at.to_rfc3339(),
        })?;
        Ok(settings)
    }

    async fn counts(&self) -> anyhow::Result<(i64, i64)> {
        let conn = self
            .db
            .connection()
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
        let tasks = DbTaskStore::new(&conn).count()?;
        let events = DbEventStore::new(&conn).count()?;
        Ok((tasks, events))
    }
}

/// Flat-file JSON store implementation
///
/// Persists the whole document per write (`tasks.json`, `events.json`,
/// `settings.json`); an async lock serializes read-modify-write cycles.
/// Doubles as the lightweight dev/test backend.
pub struct JsonFileStore {
    dir: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: tokio::sync::Mutex::new(()),
        })
    }

    fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        self.load_document("tasks.json")
    }

    fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        self.save_document("tasks.json", tasks)
    }

    fn load_events(&self) -> anyhow::Result<Vec<Event>> {
        self.load_document("events.json")
    }

    fn save_events(&self, events: &[Event]) -> anyhow::Result<()> {
        self.save_document("events.json", events)
    }

    fn load_document<T: serde::de::DeserializeOwned + Default>(
        &self,
        name: &str,
    ) -> anyhow::Result<T> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save_document<T: serde::Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> anyhow::Result<()> {
        let path = self.dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    fn load_settings(&self) -> anyhow::Result<Settings> {
        let path = self.dir.join("settings.json");
        if !path.exists() {
            return Ok(Settings {
                runner_url: None,
                runner_token: None,
                updated_at: Utc::now(),
            });
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl DataStore for JsonFileStore {
    async fn list_tasks(&self, filters: &TaskFilterQuery) -> anyhow::Result<Vec<Task>> {
        let _guard = self.lock.lock().await;
        Ok(filter_sort_limit(self.load_tasks()?, filters))
    }

    async fn get_task(&self, task_id: &str) -> anyhow::Result<Option<Task>> {
        let _guard = self.lock.lock().await;
        Ok(self.load_tasks()?.into_iter().find(|task| task.id == task_id))
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> anyhow::Result<Task> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load_tasks()?;
        let task = new_task(request);
        tasks.push(task.clone());
        self.save_tasks(&tasks)?;
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
    ) -> anyhow::Result<Option<Task>> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load_tasks()?;
        let Some(task) = tasks.iter_mut().find(|task| task.id == task_id) else {
            return Ok(None);
        };
        apply_patch(task, patch);
        let updated = task.clone();
        self.save_tasks(&tasks)?;
        Ok(Some(updated))
    }

    async fn delete_task(&self, task_id: &str) -> anyhow::Result<bool> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load_tasks()?;
        let before = tasks.len();
        tasks.retain(|task| task.id != task_id);
        if tasks.len() == before {
            return Ok(false);
        }
        self.save_tasks(&tasks)?;
        Ok(true)
    }

    async fn list_events(&self, filters: &EventFilterQuery) -> anyhow::Result<Vec<Event>> {
        let _guard = self.lock.lock().await;
        Ok(filter_sort_limit_events(self.load_events()?, filters))
    }

    async fn append_event(&self, event: &NewEvent) -> anyhow::Result<Event> {
        let _guard = self.lock.lock().await;
        let mut events = self.load_events()?;
        let stored = Event {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: event.task_id.clone(),
            event_type: event.event_type.clone(),
            timestamp: Utc::now(),
            data: event.data.clone(),
        };
        events.push(stored.clone());
        self.save_events(&events)?;
        Ok(stored)
    }

    async fn get_settings(&self) -> anyhow::Result<Settings> {
        let _guard = self.lock.lock().await;
        let settings = self.load_settings()?;
        let path = self.dir.join("settings.json");
        if !path.exists() {
            self.save_document("settings.json", &settings)?;
        }
        Ok(settings)
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> anyhow::Result<Settings> {
        let _guard = self.lock.lock().await;
        let mut settings = self.load_settings()?;
        apply_settings_patch(&mut settings, patch);
        self.save_document("settings.json", &settings)?;
        Ok(settings)
    }

    async fn counts(&self) -> anyhow::Result<(i64, i64)> {
        let _guard = self.lock.lock().await;
        Ok((self.load_tasks()?.len() as i64, self.load_events()?.len() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_request(title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: None,
            task_type: Some("shell".to_string()),
            payload: Some(json!({"command": "echo hi"})),
            tags: Some(vec!["smoke".to_string()]),
        }
    }

    fn backends() -> Vec<(&'static str, SharedStore, Option<tempfile::TempDir>)> {
        let db = Database::open_in_memory().expect("open db");
        let dir = tempfile::tempdir().expect("tempdir");
        let json_store = JsonFileStore::new(dir.path()).expect("json store");
        vec![
            ("sqlite", Arc::new(DatabaseStore::new(db)) as SharedStore, None),
            ("json", Arc::new(json_store) as SharedStore, Some(dir)),
        ]
    }

    #[tokio::test]
    async fn create_task_sets_pending_and_matching_timestamps() {
        for (name, store, _guard) in backends() {
            let task = store.create_task(&create_request("t1")).await.unwrap();
            assert_eq!(task.status, TaskStatus::Pending, "{name}");
            assert_eq!(task.created_at, task.updated_at, "{name}");
            assert_eq!(task.task_type, "shell", "{name}");

            let other = store.create_task(&create_request("t2")).await.unwrap();
            assert_ne!(task.id, other.id, "{name}: ids must be unique");

            let loaded = store.get_task(&task.id).await.unwrap().unwrap();
            assert_eq!(loaded.title, "t1", "{name}");
            assert_eq!(loaded.payload["command"], json!("echo hi"), "{name}");
        }
    }

    #[tokio::test]
    async fn update_refreshes_updated_at_and_keeps_id() {
        for (name, store, _guard) in backends() {
            let task = store.create_task(&create_request("t1")).await.unwrap();
            let patch = TaskPatch {
                title: Some("renamed".to_string()),
                ..Default::default()
            };
            let updated = store.update_task(&task.id, &patch).await.unwrap().unwrap();
            assert_eq!(updated.id, task.id, "{name}");
            assert_eq!(updated.title, "renamed", "{name}");
            assert!(updated.updated_at >= updated.created_at, "{name}");
            assert!(updated.updated_at > task.updated_at, "{name}");

            assert!(
                store.update_task("missing", &patch).await.unwrap().is_none(),
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn patch_null_clears_nullable_fields() {
        for (name, store, _guard) in backends() {
            let task = store.create_task(&create_request("t1")).await.unwrap();
            let set = TaskPatch {
                error_message: Some(Some("old failure".to_string())),
                ..Default::default()
            };
            store.update_task(&task.id, &set).await.unwrap().unwrap();

            let clear = TaskPatch {
                error_message: Some(None),
                ..Default::default()
            };
            let cleared = store.update_task(&task.id, &clear).await.unwrap().unwrap();
            assert_eq!(cleared.error_message, None, "{name}");
        }
    }

    #[tokio::test]
    async fn delete_is_not_found_when_absent() {
        for (name, store, _guard) in backends() {
            let task = store.create_task(&create_request("t1")).await.unwrap();
            assert!(store.delete_task(&task.id).await.unwrap(), "{name}");
            assert!(!store.delete_task(&task.id).await.unwrap(), "{name}");
            assert_eq!(store.counts().await.unwrap().0, 0, "{name}");
        }
    }

    #[tokio::test]
    async fn list_tasks_sorts_filters_and_limits() {
        for (name, store, _guard) in backends() {
            for i in 0..5 {
                let mut request = create_request(&format!("t{i}"));
                if i == 4 {
                    request.task_type = Some("generic_llm".to_string());
                    request.tags = Some(vec!["llm".to_string()]);
                }
                store.create_task(&request).await.unwrap();
                // created_at must strictly increase for the ordering check
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }

            let all = store.list_tasks(&TaskFilterQuery::default()).await.unwrap();
            assert_eq!(all.len(), 5, "{name}");
            assert_eq!(all[0].title, "t4", "{name}: newest first");
            assert!(
                all.windows(2).all(|w| w[0].created_at >= w[1].created_at),
                "{name}"
            );

            let limited = store
                .list_tasks(&TaskFilterQuery {
                    limit: Some(2),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(limited.len(), 2, "{name}");

            let by_type = store
                .list_tasks(&TaskFilterQuery {
                    task_type: Some("generic_llm".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(by_type.len(), 1, "{name}");

            let by_tag = store
                .list_tasks(&TaskFilterQuery {
                    tag: Some("llm".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(by_tag.len(), 1, "{name}");
        }
    }

    #[tokio::test]
    async fn events_append_and_filter() {
        for (name, store, _guard) in backends() {
            let first = store
                .append_event(&NewEvent::new(
                    Some("t-1".to_string()),
                    "task_created",
                    json!({"title": "t1"}),
                ))
                .await
                .unwrap();
            store
                .append_event(&NewEvent::new(Some("t-1".to_string()), "task_run_started", json!({})))
                .await
                .unwrap();
            store
                .append_event(&NewEvent::new(None, "task_created", json!({})))
                .await
                .unwrap();

            let for_task = store
                .list_events(&EventFilterQuery {
                    task_id: Some("t-1".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(for_task.len(), 2, "{name}");

            let created = store
                .list_events(&EventFilterQuery {
                    event_type: Some("task_created".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(created.len(), 2, "{name}");
            assert!(
                created.iter().all(|e| e.event_type == "task_created"),
                "{name}"
            );

            // append-only: the first event is byte-for-byte unchanged
            let reloaded = store
                .list_events(&EventFilterQuery::default())
                .await
                .unwrap()
                .into_iter()
                .find(|e| e.id == first.id)
                .unwrap();
            assert_eq!(reloaded, first, "{name}");
        }
    }

    #[tokio::test]
    async fn settings_lazy_init_update_and_clear() {
        for (name, store, _guard) in backends() {
            let initial = store.get_settings().await.unwrap();
            assert_eq!(initial.runner_url, None, "{name}");

            let patch = SettingsPatch {
                runner_url: Some(Some("https://runner.example.com".to_string())),
                runner_token: Some(Some("secret".to_string())),
            };
            let updated = store.update_settings(&patch).await.unwrap();
            assert_eq!(
                updated.runner_url.as_deref(),
                Some("https://runner.example.com"),
                "{name}"
            );

            let clear = SettingsPatch {
                runner_url: Some(None),
                runner_token: None,
            };
            let cleared = store.update_settings(&clear).await.unwrap();
            assert_eq!(cleared.runner_url, None, "{name}: cleared to null");
            assert_eq!(cleared.runner_token.as_deref(), Some("secret"), "{name}: untouched");
        }
    }
}
