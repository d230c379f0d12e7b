use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    core::domain::{
        ExecutionRequest, ExecutionResult, ExecutionStatus, ValidationRequest, ValidationResult,
    },
    http::models::{
        ErrorResponse, ExecuteRequest, ExecuteResponse, InfoResponse, Status, ValidateRequest,
        ValidateResponse,
    },
    languages::LanguagePipeline,
};

/// A request body that never reaches the engine.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Code is required")]
    MissingCode,
}

impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        RequestError::InvalidJson(rejection.body_text())
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        tracing::debug!("Bad request: {}", self);
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

fn required_code(code: Option<String>) -> Result<String, RequestError> {
    match code {
        Some(code) if !code.is_empty() => Ok(code),
        _ => Err(RequestError::MissingCode),
    }
}

impl TryFrom<ExecuteRequest> for ExecutionRequest {
    type Error = RequestError;

    fn try_from(req: ExecuteRequest) -> Result<Self, RequestError> {
        Ok(Self {
            code: required_code(req.code)?,
            input_data: req.input_data.unwrap_or_default(),
            timeout_seconds: req.timeout,
        })
    }
}

impl TryFrom<ValidateRequest> for ValidationRequest {
    type Error = RequestError;

    fn try_from(req: ValidateRequest) -> Result<Self, RequestError> {
        Ok(Self {
            code: required_code(req.code)?,
        })
    }
}

impl From<ExecutionStatus> for Status {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Success => Status::Success,
            ExecutionStatus::Error => Status::Error,
            ExecutionStatus::Timeout => Status::Timeout,
        }
    }
}

impl From<ExecutionResult> for ExecuteResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            output: result.output,
            error: result.error,
            execution_time: result.execution_time.as_secs_f64(),
            status: result.status.into(),
        }
    }
}

impl From<ValidationResult> for ValidateResponse {
    fn from(result: ValidationResult) -> Self {
        Self {
            is_valid: result.is_valid,
            errors: result.errors,
            warnings: result.warnings,
        }
    }
}

impl From<&LanguagePipeline> for InfoResponse {
    fn from(pipeline: &LanguagePipeline) -> Self {
        Self {
            service: pipeline.language.service_name(),
            language: pipeline.language_id().to_string(),
            version: pipeline.version.to_string(),
            max_execution_time: pipeline.limits.max_execution_time_seconds,
            max_memory_mb: pipeline.limits.max_memory_mb,
            max_code_size_kb: pipeline.limits.max_code_size_kb,
            available_libraries: pipeline
                .available_libraries
                .iter()
                .map(|lib| lib.to_string())
                .collect(),
        }
    }
}
