//! Health check endpoint

use crate::models::DataStore;
use crate::state::AppState;
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use wb_api_contract::Envelope;

/// Health check response payload
#[derive(Serialize)]
pub struct HealthData {
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseHealth,
    pub runner: RunnerHealth,
}

/// Storage health summary
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub healthy: bool,
    pub tasks_count: i64,
    pub events_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runner configuration summary
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerHealth {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub note: String,
}

/// Health check endpoint
///
/// Always answers 200 with an ok envelope; storage trouble shows up in the
/// `database` section instead of failing the probe.
pub async fn health(State(state): State<AppState>) -> Json<Envelope<HealthData>> {
    let (healthy, tasks_count, events_count, error) = match state.store.counts().await {
        Ok((tasks, events)) => (true, tasks, events, None),
        Err(err) => (false, 0, 0, Some(err.to_string())),
    };

    let base_url = state.resolved_runner_url().await;
    let configured = base_url.is_some();
    let note = if configured {
        "Runner is configured and ready"
    } else {
        "Set a runner URL in Settings to enable remote execution"
    };

    Json(Envelope::ok(HealthData {
        timestamp: Utc::now(),
        database: DatabaseHealth {
            healthy,
            tasks_count,
            events_count,
            error,
        },
        runner: RunnerHealth {
            configured,
            base_url,
            note: note.to_string(),
        },
    }))
}
