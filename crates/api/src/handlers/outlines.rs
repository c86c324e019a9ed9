//! Handlers for stored document outlines.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use folio_core::error::CoreError;
use folio_core::files::FALLBACK_DOCUMENT_NAME;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::scripting::orchestrator::OutlineResult;
use crate::state::AppState;

/// GET /api/v1/outlines/{filename}
///
/// Returns a stored outline. Only bare `.json` names are accepted.
pub async fn get_outline(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    if filename.trim().is_empty() {
        return Err(AppError::BadRequest("Filename not provided".to_string()));
    }
    if filename.contains("..") || filename.contains(['/', '\\']) {
        return Err(AppError::BadRequest("Invalid filename".to_string()));
    }
    if !filename.ends_with(".json") {
        return Err(AppError::BadRequest("Only .json outlines are served".to_string()));
    }

    let path = state.scripts.outlines_dir().join(&filename);
    let bytes = tokio::fs::read(&path).await.map_err(|_| {
        AppError::Core(CoreError::NotFound {
            entity: "Outline",
            id: filename.clone(),
        })
    })?;
    let outline = serde_json::from_slice(&bytes).map_err(|e| {
        AppError::InternalError(format!("Stored outline '{filename}' is not valid JSON: {e}"))
    })?;

    Ok(Json(DataResponse { data: outline }))
}

/// POST /api/v1/outlines
///
/// Multipart `file` (plus optional `name` used when the part has no
/// filename). Runs the outline script and returns the stored outline.
pub async fn upload_outline(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<OutlineResult>>> {
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    let mut fallback_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty() && *n != "blob")
                    .map(str::to_string);
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload = Some((file_name, content.to_vec()));
            }
            "name" => {
                fallback_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let Some((file_name, content)) = upload else {
        return Err(AppError::BadRequest("Missing 'file' form field".to_string()));
    };
    let file_name = file_name
        .or(fallback_name.filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| FALLBACK_DOCUMENT_NAME.to_string());

    let result = state.scripts.extract_outline(&file_name, &content).await?;
    Ok(Json(DataResponse { data: result }))
}
