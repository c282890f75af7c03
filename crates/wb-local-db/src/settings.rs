// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Runner settings singleton storage

use crate::Result;
use rusqlite::{Connection, OptionalExtension, params};

/// Settings row as stored in SQLite; the table holds exactly one row
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsRecord {
    pub runner_url: Option<String>,
    pub runner_token: Option<String>,
    pub updated_at: String,
}

/// Record-level settings store over a borrowed connection
pub struct SettingsStore<'a> {
    conn: &'a Connection,
}

impl<'a> SettingsStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Load the singleton row, lazily creating an empty default on first
    /// access. `INSERT OR IGNORE` keeps concurrent first reads safe.
    pub fn get_or_init(&self, now: &str) -> Result<SettingsRecord> {
        self.conn.execute(
            "INSERT OR IGNORE INTO settings (id, runner_url, runner_token, updated_at) \
             VALUES (1, NULL, NULL, ?1)",
            params![now],
        )?;

        let record = self
            .conn
            .query_row(
                "SELECT runner_url, runner_token, updated_at FROM settings WHERE id = 1",
                [],
                |row| {
                    Ok(SettingsRecord {
                        runner_url: row.get(0)?,
                        runner_token: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()?;

        // the row was just upserted, so this cannot be None
        Ok(record.unwrap_or(SettingsRecord {
            runner_url: None,
            runner_token: None,
            updated_at: now.to_string(),
        }))
    }

    /// Overwrite the singleton row.
    pub fn update(&self, record: &SettingsRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (id, runner_url, runner_token, updated_at) \
             VALUES (1, ?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET \
                 runner_url = excluded.runner_url, \
                 runner_token = excluded.runner_token, \
                 updated_at = excluded.updated_at",
            params![record.runner_url, record.runner_token, record.updated_at],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn get_or_init_creates_default_once() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().lock().unwrap();
        let store = SettingsStore::new(&conn);

        let first = store.get_or_init("2025-01-01T00:00:00Z").unwrap();
        assert_eq!(first.runner_url, None);
        assert_eq!(first.updated_at, "2025-01-01T00:00:00Z");

        // a later read must not reset updated_at
        let second = store.get_or_init("2025-06-01T00:00:00Z").unwrap();
        assert_eq!(second.updated_at, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn update_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().lock().unwrap();
        let store = SettingsStore::new(&conn);

        store
            .update(&SettingsRecord {
                runner_url: Some("https://runner.example.com".to_string()),
                runner_token: Some("secret".to_string()),
                updated_at: "2025-02-01T00:00:00Z".to_string(),
            })
            .unwrap();

        let loaded = store.get_or_init("2025-03-01T00:00:00Z").unwrap();
        assert_eq!(loaded.runner_url.as_deref(), Some("https://runner.example.com"));
        assert_eq!(loaded.runner_token.as_deref(), Some("secret"));
        assert_eq!(loaded.updated_at, "2025-02-01T00:00:00Z");
    }
}
