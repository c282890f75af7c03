// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Runner settings endpoints
//!
//! The stored token is masked whenever it is echoed back; masking is a
//! serialization-time transform and never touches the stored value.

use crate::ServerResult;
use crate::error::ServerError;
use crate::models::DataStore;
use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use wb_api_contract::*;

/// Get current runner settings (token masked)
pub async fn get_settings(
    State(state): State<AppState>,
) -> ServerResult<Json<Envelope<SettingsView>>> {
    let settings = state.store.get_settings().await?;
    Ok(Json(Envelope::ok(settings.masked())))
}

/// Update runner settings
///
/// Empty-string fields clear to null; a non-empty URL must carry an http(s)
/// scheme.
pub async fn put_settings(
    State(state): State<AppState>,
    payload: Result<Json<SettingsPatch>, JsonRejection>,
) -> ServerResult<Json<Envelope<SettingsView>>> {
    let Json(patch) =
        payload.map_err(|_| ServerError::BadRequest("Invalid JSON body".to_string()))?;
    let patch = patch.normalized();
    validation::validate_settings_patch(&patch)
        .map_err(|err| ServerError::Validation(err.to_string()))?;

    let settings = state.store.update_settings(&patch).await?;
    tracing::info!(
        runner_configured = settings.runner_url.is_some(),
        "runner settings updated"
    );
    Ok(Json(Envelope::ok(settings.masked())))
}

/// Probe the configured runner's health endpoint
pub async fn test_runner(
    State(state): State<AppState>,
) -> ServerResult<Json<Envelope<RunnerTestData>>> {
    let client = state.runner_client().await?;
    let runner_info = client.health().await?;
    Ok(Json(Envelope::ok(RunnerTestData {
        reachable: true,
        runner_url: client.base_url().to_string(),
        runner_info,
    })))
}
