// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Schema definition and idempotent setup

use rusqlite::Connection;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id            TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    description   TEXT,
    status        TEXT NOT NULL,
    task_type     TEXT NOT NULL DEFAULT 'general',
    payload       TEXT,
    tags          TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    last_run_at   TEXT,
    runner_status TEXT,
    output_text   TEXT,
    output_raw    TEXT,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);

CREATE TABLE IF NOT EXISTS events (
    id         TEXT PRIMARY KEY,
    task_id    TEXT,
    event_type TEXT NOT NULL,
    timestamp  TEXT NOT NULL,
    data       TEXT
);

CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
CREATE INDEX IF NOT EXISTS idx_events_task_id ON events(task_id);

CREATE TABLE IF NOT EXISTS settings (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    runner_url   TEXT,
    runner_token TEXT,
    updated_at   TEXT NOT NULL
);
"#;

/// Create all tables and indexes that do not exist yet.
///
/// Safe to call from multiple processes at once: every statement is
/// `IF NOT EXISTS`, there is no check-then-create window.
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
