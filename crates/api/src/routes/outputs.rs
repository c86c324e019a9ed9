use axum::routing::get;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Mounted at `/outputs`.
pub fn router() -> Router<AppState> {
    Router::new().route("/{*path}", get(files::serve_output))
}
