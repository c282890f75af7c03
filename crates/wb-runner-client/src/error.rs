// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for runner client operations

use thiserror::Error;

/// Result type for runner client operations
pub type RunnerClientResult<T> = Result<T, RunnerClientError>;

/// The four failure kinds every runner call normalizes into
///
/// Callers branch on the variant; the `Display` form is the human-readable
/// message surfaced through the API envelope.
#[derive(Debug, Clone, Error)]
pub enum RunnerClientError {
    /// No usable runner base URL was configured; no network attempt was made
    #[error("{0}")]
    NotConfigured(String),

    /// Network failure or timeout before a response arrived
    #[error("Failed to reach runner: {0}")]
    Unreachable(String),

    /// The runner answered with a non-2xx status or a body signalling failure
    #[error("{0}")]
    Runner(String),

    /// A 2xx response whose body could not be parsed as JSON
    #[error("{0}")]
    InvalidResponse(String),
}

impl RunnerClientError {
    pub fn not_configured() -> Self {
        RunnerClientError::NotConfigured(
            "Runner URL not configured. Set it in Settings.".to_string(),
        )
    }

    /// Short tag used in event payloads and logs
    pub fn kind(&self) -> &'static str {
        match self {
            RunnerClientError::NotConfigured(_) => "not_configured",
            RunnerClientError::Unreachable(_) => "unreachable",
            RunnerClientError::Runner(_) => "runner_error",
            RunnerClientError::InvalidResponse(_) => "invalid_response",
        }
    }
}
