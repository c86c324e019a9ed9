//! Route definitions for document outlines.
//!
//! Mounted at `/outlines`.
//!
//! ```text
//! POST /                 upload_outline
//! GET  /{filename}       get_outline
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::outlines;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(outlines::upload_outline))
        .route("/{filename}", get(outlines::get_outline))
}
