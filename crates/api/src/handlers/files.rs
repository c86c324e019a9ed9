//! Static file serving for worker outputs and generated audio.
//!
//! Supports single byte-range requests. Paths with a parent-directory
//! segment are rejected before anything touches the filesystem.

use std::path::Path;

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::header::{self, HeaderMap};
use axum::http::StatusCode;
use axum::response::Response;
use folio_core::error::CoreError;
use folio_core::files::{content_type_for_extension, safe_join};
use folio_core::range::{resolve_range, RangeOutcome};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/v1/outputs/{*path}
pub async fn serve_output(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    serve_file(&state.config.reports_dir(), &path, &headers).await
}

/// GET /audio/{*path}
pub async fn serve_audio(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    serve_file(&state.config.audio_dir(), &path, &headers).await
}

/// Serve `rel` from under `base`, honouring a `Range` header.
pub async fn serve_file(base: &Path, rel: &str, headers: &HeaderMap) -> AppResult<Response> {
    let path = safe_join(base, rel)?;

    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "File",
            id: rel.to_string(),
        })
    };
    let metadata = tokio::fs::metadata(&path).await.map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    let file_size = metadata.len();
    let content_type = content_type_for_extension(rel);

    // A Range header that is not valid UTF-8 is ignored like any malformed one.
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let outcome = resolve_range(range, file_size);

    match outcome {
        RangeOutcome::Unsatisfiable => build(
            Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
                .header(header::ACCEPT_RANGES, "bytes")
                .body(Body::empty()),
        ),
        RangeOutcome::Partial { start, end } => {
            let length = end - start + 1;

            let mut file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| AppError::InternalError(e.to_string()))?;
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|e| AppError::InternalError(e.to_string()))?;

            let stream = ReaderStream::new(file.take(length));
            let content_range = outcome.content_range(file_size).unwrap_or_default();

            build(
                Response::builder()
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, length.to_string())
                    .header(header::CONTENT_RANGE, content_range)
                    .header(header::ACCEPT_RANGES, "bytes")
                    .body(Body::from_stream(stream)),
            )
        }
        RangeOutcome::Full => {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| AppError::InternalError(e.to_string()))?;
            let stream = ReaderStream::new(file);

            build(
                Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, file_size.to_string())
                    .header(header::ACCEPT_RANGES, "bytes")
                    .body(Body::from_stream(stream)),
            )
        }
    }
}

fn build(response: axum::http::Result<Response>) -> AppResult<Response> {
    response.map_err(|e| AppError::InternalError(format!("Failed to build response: {e}")))
}
