//! Validation helpers for API contract types

use crate::error::ApiContractError;
use crate::types::*;
use validator::Validate;

/// Validate a create task request
///
/// The derive catches the empty string; whitespace-only titles are rejected
/// here as well so `"   "` never becomes a task.
pub fn validate_create_task_request(request: &CreateTaskRequest) -> Result<(), ApiContractError> {
    request.validate()?;

    if request.title.trim().is_empty() {
        return Err(ApiContractError::MissingTitle);
    }

    Ok(())
}

/// Validate a runner base URL
///
/// The URL must carry an explicit http(s) scheme and parse as an absolute URL.
pub fn validate_runner_url(url_str: &str) -> Result<(), ApiContractError> {
    if !url_str.starts_with("http://") && !url_str.starts_with("https://") {
        return Err(ApiContractError::InvalidRunnerUrl(url_str.to_string()));
    }
    url::Url::parse(url_str)?;
    Ok(())
}

/// Validate a settings patch after normalization; cleared fields pass.
pub fn validate_settings_patch(patch: &SettingsPatch) -> Result<(), ApiContractError> {
    if let Some(Some(url)) = &patch.runner_url {
        validate_runner_url(url)?;
    }
    Ok(())
}
