// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Task record storage

use crate::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Task row as stored in SQLite
///
/// Timestamps are RFC 3339 strings; `payload`, `tags`, and `output_raw`
/// are JSON-encoded TEXT columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub task_type: String,
    pub payload: Option<String>,
    pub tags: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_run_at: Option<String>,
    pub runner_status: Option<String>,
    pub output_text: Option<String>,
    pub output_raw: Option<String>,
    pub error_message: Option<String>,
}

/// Record-level task store over a borrowed connection
pub struct TaskStore<'a> {
    conn: &'a Connection,
}

const SELECT_COLUMNS: &str = "id, title, description, status, task_type, payload, tags, \
     created_at, updated_at, last_run_at, runner_status, output_text, output_raw, error_message";

impl<'a> TaskStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, record: &TaskRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tasks (id, title, description, status, task_type, payload, tags, \
             created_at, updated_at, last_run_at, runner_status, output_text, output_raw, error_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.id,
                record.title,
                record.description,
                record.status,
                record.task_type,
                record.payload,
                record.tags,
                record.created_at,
                record.updated_at,
                record.last_run_at,
                record.runner_status,
                record.output_text,
                record.output_raw,
                record.error_message,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<TaskRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                Self::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Overwrite the row for `record.id`. Returns false when the id is absent.
    pub fn update(&self, record: &TaskRecord) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET title = ?2, description = ?3, status = ?4, task_type = ?5, \
             payload = ?6, tags = ?7, created_at = ?8, updated_at = ?9, last_run_at = ?10, \
             runner_status = ?11, output_text = ?12, output_raw = ?13, error_message = ?14 \
             WHERE id = ?1",
            params![
                record.id,
                record.title,
                record.description,
                record.status,
                record.task_type,
                record.payload,
                record.tags,
                record.created_at,
                record.updated_at,
                record.last_run_at,
                record.runner_status,
                record.output_text,
                record.output_raw,
                record.error_message,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Returns false when the id is absent.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// List tasks newest-first, optionally filtered by status and type.
    ///
    /// Tag filtering and limits are applied by the caller, after the JSON
    /// tags column is decoded.
    pub fn list(&self, status: Option<&str>, task_type: Option<&str>) -> Result<Vec<TaskRecord>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM tasks");
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<&str> = Vec::new();

        if let Some(status) = status {
            clauses.push("status = ?");
            args.push(status);
        }
        if let Some(task_type) = task_type {
            clauses.push("task_type = ?");
            args.push(task_type);
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), Self::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<i64> {
        let count = self.conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(count)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
        Ok(TaskRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            task_type: row.get(4)?,
            payload: row.get(5)?,
            tags: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            last_run_at: row.get(9)?,
            runner_status: row.get(10)?,
            output_text: row.get(11)?,
            output_raw: row.get(12)?,
            error_message: row.get(13)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn sample(id: &str, created_at: &str) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status: "pending".to_string(),
            task_type: "general".to_string(),
            payload: Some(r#"{"command":"echo hi"}"#.to_string()),
            tags: Some(r#"["a","b"]"#.to_string()),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            last_run_at: None,
            runner_status: None,
            output_text: None,
            output_raw: None,
            error_message: None,
        }
    }

    #[test]
    fn insert_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().lock().unwrap();
        let store = TaskStore::new(&conn);

        let record = sample("t-1", "2025-01-01T00:00:00Z");
        store.insert(&record).unwrap();

        let loaded = store.get("t-1").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first_and_filters() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().lock().unwrap();
        let store = TaskStore::new(&conn);

        store.insert(&sample("t-1", "2025-01-01T00:00:00Z")).unwrap();
        store.insert(&sample("t-2", "2025-01-02T00:00:00Z")).unwrap();
        let mut shell = sample("t-3", "2025-01-03T00:00:00Z");
        shell.task_type = "shell".to_string();
        shell.status = "completed".to_string();
        store.insert(&shell).unwrap();

        let all = store.list(None, None).unwrap();
        assert_eq!(
            all.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["t-3", "t-2", "t-1"]
        );

        let shells = store.list(None, Some("shell")).unwrap();
        assert_eq!(shells.len(), 1);
        assert_eq!(shells[0].id, "t-3");

        let completed = store.list(Some("completed"), Some("shell")).unwrap();
        assert_eq!(completed.len(), 1);

        assert!(store.list(Some("failed"), None).unwrap().is_empty());
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().lock().unwrap();
        let store = TaskStore::new(&conn);

        let mut record = sample("t-1", "2025-01-01T00:00:00Z");
        assert!(!store.update(&record).unwrap());

        store.insert(&record).unwrap();
        record.status = "running".to_string();
        assert!(store.update(&record).unwrap());
        assert_eq!(store.get("t-1").unwrap().unwrap().status, "running");

        assert!(store.delete("t-1").unwrap());
        assert!(!store.delete("t-1").unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }
}
