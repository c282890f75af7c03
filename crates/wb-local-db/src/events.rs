// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Append-only event log storage
//!
//! Events are never updated or deleted; this store deliberately exposes no
//! such operations.

use crate::Result;
use rusqlite::{Connection, Row, params};

/// Event row as stored in SQLite; `data` is a JSON-encoded TEXT column
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: String,
    pub task_id: Option<String>,
    pub event_type: String,
    pub timestamp: String,
    pub data: Option<String>,
}

/// Record-level event store over a borrowed connection
pub struct EventStore<'a> {
    conn: &'a Connection,
}

impl<'a> EventStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, record: &EventRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, task_id, event_type, timestamp, data) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.task_id,
                record.event_type,
                record.timestamp,
                record.data,
            ],
        )?;
        Ok(())
    }

    /// List events newest-first, optionally filtered by task id and type.
    pub fn list(
        &self,
        task_id: Option<&str>,
        event_type: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<EventRecord>> {
        let mut sql = String::from("SELECT id, task_id, event_type, timestamp, data FROM events");
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(task_id) = task_id {
            clauses.push("task_id = ?");
            args.push(task_id.to_string().into());
        }
        if let Some(event_type) = event_type {
            clauses.push("event_type = ?");
            args.push(event_type.to_string().into());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp DESC");
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            args.push((limit as i64).into());
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), Self::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<i64> {
        let count = self.conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
        Ok(EventRecord {
            id: row.get(0)?,
            task_id: row.get(1)?,
            event_type: row.get(2)?,
            timestamp: row.get(3)?,
            data: row.get(4)?,
        })
    }
}
