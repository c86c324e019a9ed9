//! Route definitions for the report job.
//!
//! Mounted at `/jobs`. There is only ever one job, addressed as `current`.
//!
//! ```text
//! POST /                    submit_job
//! GET  /current             get_current_job
//! POST /current/cancel      cancel_current_job
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::submit_job))
        .route("/current", get(jobs::get_current_job))
        .route("/current/cancel", post(jobs::cancel_current_job))
}
