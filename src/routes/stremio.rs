use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{StreamRequest, StreamsResponse};
use crate::services::metrics::{record_request, RequestOutcome};
use crate::services::stremio::{manifest, to_streams};
use crate::AppState;

/// GET /manifest.json
pub async fn get_manifest() -> impl IntoResponse {
    Json(manifest())
}

/// GET /stream/:type/:id.json
///
/// Always answers 200 with a `streams` list; failures only make it empty.
pub async fn get_streams(
    State(state): State<Arc<AppState>>,
    Path((media_type, id)): Path<(String, String)>,
) -> Json<StreamsResponse> {
    let id = id.strip_suffix(".json").unwrap_or(&id);

    let Some(request) = StreamRequest::parse(id) else {
        warn!(id, media_type = %media_type, "unsupported content id");
        record_request(RequestOutcome::InvalidId);
        return Json(StreamsResponse::empty());
    };

    info!(
        imdb_id = %request.imdb_id,
        media_type = %media_type,
        episode = ?request.episode,
        "stream request"
    );

    match state.pipeline.resolve(&request.imdb_id, request.episode).await {
        Ok(bundle) => {
            let streams = to_streams(&bundle, &state.config);
            let outcome = if streams.is_empty() {
                RequestOutcome::Empty
            } else {
                RequestOutcome::Streams
            };
            record_request(outcome);

            info!(imdb_id = %request.imdb_id, count = streams.len(), "streams ready");
            Json(StreamsResponse { streams })
        }
        Err(e) => {
            warn!(imdb_id = %request.imdb_id, error = %e, "stream resolution failed");
            record_request(RequestOutcome::Failed);
            Json(StreamsResponse::empty())
        }
    }
}
