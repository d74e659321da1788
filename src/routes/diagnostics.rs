//! Diagnostic endpoints exposing raw stream bundles

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::models::{PlayableSource, StreamBundle};
use crate::AppState;

type DiagnosticResult = Result<Json<StreamBundle>, (StatusCode, Json<serde_json::Value>)>;

fn internal_error(err: PipelineError) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!(error = %err, "diagnostic request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}

/// GET /test/rpm/:video_id - assemble a provider video id directly
pub async fn test_rpm(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> DiagnosticResult {
    state
        .pipeline
        .assemble(&PlayableSource::primary(video_id))
        .await
        .map(Json)
        .map_err(internal_error)
}

#[derive(Debug, Deserialize)]
pub struct EpisodeQuery {
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

/// GET /test/imdb/:imdb_id?season=&episode= - run the whole pipeline
pub async fn test_imdb(
    State(state): State<Arc<AppState>>,
    Path(imdb_id): Path<String>,
    Query(query): Query<EpisodeQuery>,
) -> DiagnosticResult {
    let episode = query
        .season
        .zip(query.episode)
        .filter(|(s, e)| *s > 0 && *e > 0);

    state
        .pipeline
        .resolve(&imdb_id, episode)
        .await
        .map(Json)
        .map_err(internal_error)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use mockito::{Matcher, Server};
    use tower::ServiceExt;

    use crate::services::rpm::test_support::mock_encrypted;
    use crate::test_support::test_router;

    #[tokio::test]
    async fn test_rpm_route_returns_bundle() {
        let mut server = Server::new_async().await;
        mock_encrypted(&mut server, "info", "k6nwn", r#"{"title":"Film"}"#).await;
        mock_encrypted(
            &mut server,
            "video",
            "k6nwn",
            r#"{"source":"https://cdn.rpmstream.live/hls/master.m3u8","subtitle":{"forced":"/sub/k6nwn.vtt#hun"}}"#,
        )
        .await;

        let response = test_router(&server.url())
            .oneshot(Request::get("/test/rpm/k6nwn").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["decoder"], "primary");
        assert_eq!(json["variants"], serde_json::json!([]));
        assert_eq!(json["subtitles"][0]["lang"], "hun");
    }

    #[tokio::test]
    async fn test_imdb_route_reports_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/find/tt0000002")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"movie_results":[]}"#)
            .create_async()
            .await;

        let response = test_router(&server.url())
            .oneshot(
                Request::get("/test/imdb/tt0000002?season=1&episode=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("Not found"));
    }
}
