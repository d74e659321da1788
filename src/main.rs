mod config;
mod error;
mod models;
mod routes;
mod services;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::Pipeline;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub pipeline: Pipeline,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self {
            config,
            pipeline,
            start_time: Instant::now(),
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/live", get(routes::health::live))
        // Stremio addon protocol
        .route("/manifest.json", get(routes::stremio::get_manifest))
        .route("/stream/:media_type/:id", get(routes::stremio::get_streams))
        // Diagnostics
        .route("/test/rpm/:video_id", get(routes::diagnostics::test_rpm))
        .route("/test/imdb/:imdb_id", get(routes::diagnostics::test_imdb))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hdmozi_addon=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Config::from_env();
    let port = config.port;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        site = %config.site.base_url,
        provider = %config.rpm.base_url,
        "Starting HDMozi addon"
    );

    let state = Arc::new(AppState::new(config)?);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);
    tracing::info!("Manifest: http://127.0.0.1:{}/manifest.json", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
