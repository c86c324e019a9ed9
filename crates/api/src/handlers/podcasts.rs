use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PodcastRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PodcastResponse {
    pub audio_url: String,
}

/// POST /api/v1/podcasts
///
/// Synthesizes narration for `text`. Blocks until the script finishes.
pub async fn create_podcast(
    State(state): State<AppState>,
    Json(body): Json<PodcastRequest>,
) -> AppResult<Json<DataResponse<PodcastResponse>>> {
    let audio_url = state.scripts.synthesize_podcast(&body.text).await?;
    Ok(Json(DataResponse {
        data: PodcastResponse { audio_url },
    }))
}
