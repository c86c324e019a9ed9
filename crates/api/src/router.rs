//! Router assembly for the Folio server.
//!
//! [`build_app_router`] is the one place the route tree meets its
//! middleware; `main.rs` and the integration tests both go through it.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{CONTENT_TYPE, RANGE};
use axum::http::{HeaderName, Method};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Assemble health, audio and `/api/v1` under the shared middleware.
///
/// Timeouts are per route group (see [`routes::api_routes`]): script
/// routes may run for the script timeout, the rest for the request timeout.
/// Outermost first, requests pass CORS, get an `x-request-id`, are traced,
/// have the id copied to the response, then reach panic recovery and the
/// upload limit.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let root = Router::new()
        .merge(routes::health::router())
        .merge(routes::audio::router())
        .layer(routes::request_timeout(config));

    root.nest("/api/v1", routes::api_routes(config))
        // PDFs arrive whole in multipart bodies.
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CatchPanicLayer::new())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS for the configured browser origins. Range is allowed so audio
/// players can seek.
///
/// Panics at startup on an unparsable origin.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, RANGE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
