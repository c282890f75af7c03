//! Server error types and handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use wb_api_contract::Envelope;
use wb_runner_client::RunnerClientError;

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] wb_local_db::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    RunnerClient(#[from] RunnerClientError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status for the envelope carrying this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::RunnerClient(err) => match err {
                // not configured = our problem, everything else = upstream
                RunnerClientError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            ServerError::Database(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let envelope: Envelope<serde_json::Value> = Envelope::error(self.to_string());
        (status, Json(envelope)).into_response()
    }
}

/// Convert any error to ServerError
impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

/// Convert contract validation failures
impl From<wb_api_contract::ApiContractError> for ServerError {
    fn from(err: wb_api_contract::ApiContractError) -> Self {
        ServerError::Validation(err.to_string())
    }
}

/// Convert IO errors
impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ServerError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::TaskNotFound("t-1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::RunnerClient(RunnerClientError::not_configured()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::RunnerClient(RunnerClientError::Unreachable("down".into()))
                .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServerError::RunnerClient(RunnerClientError::Runner("boom".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServerError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
