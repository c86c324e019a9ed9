use axum::extract::{Query, State};
use axum::Json;
use folio_core::reports::{self, ReportPoll};

use crate::error::{AppError, AppResult};
use crate::query::KnownFilesParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/reports?known=a.json,b.json
///
/// Reports written since the client's known set, plus the run status. The
/// status is read before the directory so a run that finishes in between
/// is never reported as stopped with files still missing from the delta.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<KnownFilesParams>,
) -> AppResult<Json<DataResponse<ReportPoll>>> {
    let run = state.jobs.status().await;
    let delta = reports::discover_reports(state.jobs.output_dir(), &params.known_set())
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to read reports: {e}")))?;

    if !delta.is_empty() {
        tracing::debug!(new_files = delta.new_files.len(), run_id = ?run.run_id, "New reports discovered");
    }

    Ok(Json(DataResponse {
        data: ReportPoll {
            delta,
            running: run.running,
            run_id: run.run_id,
            last_exit_code: run.last_exit_code,
        },
    }))
}
