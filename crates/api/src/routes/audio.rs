use axum::routing::get;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Audio file routes (root-level, NOT under `/api/v1`, so the URLs the
/// podcast script prints resolve as-is).
pub fn router() -> Router<AppState> {
    Router::new().route("/audio/{*path}", get(files::serve_audio))
}
