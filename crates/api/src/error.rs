use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_core::error::CoreError;
use folio_core::jobs::JobError;
use folio_core::scripting::ScriptError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors from `folio_core` and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses:
/// `{ "error": <message>, "code": <kind> }`, plus `"stderr"` when a script
/// left diagnostics behind.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `folio_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A refused job submission.
    #[error(transparent)]
    Job(#[from] JobError),

    /// A synchronous script that could not be run or failed.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut stderr: Option<String> = None;

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("{entity} '{id}' not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        INTERNAL_MESSAGE.to_string(),
                    )
                }
            },

            // --- Job submission ---
            AppError::Job(err) => {
                stderr = err.diagnostics().map(str::to_string);
                if err.is_client_error() {
                    (StatusCode::BAD_REQUEST, err.kind(), err.to_string())
                } else {
                    tracing::error!(error = %err, kind = err.kind(), "Job launch failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, err.kind(), err.to_string())
                }
            }

            // --- Synchronous scripts ---
            AppError::Script(err) => match err {
                ScriptError::NotFound(path) => {
                    tracing::error!(%path, "Script missing");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "script_not_found",
                        err.to_string(),
                    )
                }
                ScriptError::InterpreterUnavailable { output, .. } => {
                    stderr = Some(output.clone());
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "interpreter_not_found",
                        err.to_string(),
                    )
                }
                ScriptError::Timeout { .. } => {
                    (StatusCode::GATEWAY_TIMEOUT, "script_timeout", err.to_string())
                }
                ScriptError::ExecutionFailed { exit_code, stderr: output } => {
                    tracing::warn!(exit_code, "Script failed");
                    stderr = Some(output.clone());
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "script_failed",
                        format!("Script failed with exit code {exit_code}"),
                    )
                }
                ScriptError::IoError(e) => {
                    tracing::error!(error = %e, "Script I/O error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        INTERNAL_MESSAGE.to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    INTERNAL_MESSAGE.to_string(),
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(stderr) = stderr.filter(|s| !s.trim().is_empty()) {
            body["stderr"] = json!(stderr);
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn client_job_errors_are_400_with_kind() {
        let (status, body) = render(JobError::NoDocumentsProvided.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "no_documents_provided");
        assert!(body.get("stderr").is_none());
    }

    #[tokio::test]
    async fn interpreter_failure_carries_stderr() {
        let err = JobError::InterpreterNotFound {
            program: "python3".into(),
            diagnostics: "No such file or directory".into(),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "interpreter_not_found");
        assert_eq!(body["stderr"], "No such file or directory");
    }

    #[tokio::test]
    async fn internal_messages_are_sanitized() {
        let (status, body) = render(AppError::InternalError("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn script_timeout_is_gateway_timeout() {
        let (status, body) = render(ScriptError::Timeout { elapsed_ms: 10 }.into()).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["code"], "script_timeout");
    }
}
