// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! SQLite database management for local Workbench state
//!
//! Owns the schema and record-level access for tasks, events, and the
//! runner settings singleton. Structured fields (`payload`, `tags`, event
//! `data`) are JSON-encoded TEXT columns; the encoding stays inside the
//! storage path and never shapes the API data model.

mod schema;

pub mod events;
pub mod settings;
pub mod tasks;

pub use events::{EventRecord, EventStore};
pub use settings::{SettingsRecord, SettingsStore};
pub use tasks::{TaskRecord, TaskStore};

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Errors surfaced by the local database layer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Handle to the local SQLite database
///
/// Cheap to clone; all access goes through the shared connection behind
/// `connection()`.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (creating if necessary) the database at `path` and make sure the
    /// schema exists. Schema setup uses `CREATE TABLE IF NOT EXISTS`
    /// throughout, so concurrent opens are safe.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (used by tests and `:memory:` deployments)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // the pragma answers with the resulting mode, so read it as a query
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(())).ok();
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::ensure_schema(&conn)?;
        tracing::debug!("database schema ensured");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Access the underlying connection
    pub fn connection(&self) -> &Mutex<Connection> {
        &self.conn
    }
}
