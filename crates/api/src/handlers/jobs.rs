//! Handlers for submitting, inspecting and cancelling the report job.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::files::FALLBACK_DOCUMENT_NAME;
use folio_core::jobs::{JobAccepted, JobRequest, SourceDocument};
use folio_core::run_state::RunState;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying the task description.
const TASK_FIELD: &str = "selected_text";
/// Repeated multipart field carrying the source documents.
const FILES_FIELD: &str = "files";

#[derive(Debug, Serialize)]
pub struct CancelResult {
    pub cancelled: bool,
}

/// POST /api/v1/jobs
///
/// Accepts `selected_text` plus one or more `files` parts, preempts any
/// running job and starts a new one. Responds 202 once the worker is
/// spawned; its results are collected through `/reports`.
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<JobAccepted>>)> {
    let mut query = String::new();
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            TASK_FIELD => {
                query = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            FILES_FIELD => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty() && *n != "blob")
                    .unwrap_or(FALLBACK_DOCUMENT_NAME)
                    .to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                // Browsers send an empty part for an untouched file input.
                if content.is_empty() {
                    continue;
                }
                documents.push(SourceDocument {
                    file_name,
                    content: content.to_vec(),
                });
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let accepted = state.jobs.submit(JobRequest { query, documents }).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: accepted })))
}

/// GET /api/v1/jobs/current
pub async fn get_current_job(State(state): State<AppState>) -> Json<DataResponse<RunState>> {
    Json(DataResponse {
        data: state.jobs.status().await,
    })
}

/// POST /api/v1/jobs/current/cancel
///
/// Stops the running worker, if any. Cancelling when idle is not an error.
pub async fn cancel_current_job(
    State(state): State<AppState>,
) -> Json<DataResponse<CancelResult>> {
    let cancelled = state.jobs.cancel().await;
    Json(DataResponse {
        data: CancelResult { cancelled },
    })
}
