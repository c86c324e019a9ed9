use axum::routing::post;
use axum::Router;

use crate::handlers::podcasts;
use crate::state::AppState;

/// Mounted at `/podcasts`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(podcasts::create_podcast))
}
