pub mod audio;
pub mod health;
pub mod jobs;
pub mod outlines;
pub mod outputs;
pub mod podcasts;
pub mod reports;

use axum::http::StatusCode;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                       submit job (POST, multipart)
/// /jobs/current               current run state (GET)
/// /jobs/current/cancel        cancel running job (POST)
///
/// /reports                    new reports since ?known= (GET)
///
/// /outputs/{*path}            raw worker output (GET, range)
///
/// /outlines                   extract outline (POST, multipart)
/// /outlines/{filename}        stored outline (GET)
///
/// /podcasts                   synthesize podcast (POST)
/// ```
///
/// `/outlines` and `/podcasts` wait on a script and are bounded by the
/// script route timeout; everything else by the request timeout.
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    let quick = Router::new()
        // Single-flight report job.
        .nest("/jobs", jobs::router())
        // Incremental report polling.
        .nest("/reports", reports::router())
        // Worker output files.
        .nest("/outputs", outputs::router())
        .layer(request_timeout(config));

    let scripted = Router::new()
        // Outline extraction and retrieval.
        .nest("/outlines", outlines::router())
        // Podcast synthesis.
        .nest("/podcasts", podcasts::router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.script_route_timeout(),
        ));

    quick.merge(scripted)
}

/// Timeout layer for routes that never wait on a script.
pub fn request_timeout(config: &ServerConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, config.request_timeout())
}
