//! HTTP front end: upload page, JSON report and workbook download.

use crate::config::MergerConfig;
use crate::error::MergerError;
use crate::pipeline::Pipeline;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

mod page;
mod routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Builds the router with request tracing and the upload size limit.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/merge", post(routes::merge_page))
        .route("/api/merge", post(routes::merge_report))
        .route("/api/merge/download", post(routes::merge_download))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until the process stops.
pub async fn serve(config: MergerConfig) -> Result<(), MergerError> {
    let state = AppState::new(Pipeline::from_settings(&config.merge));
    let app = router(state, config.server.max_upload_bytes);
    let addr = config.listen_address();

    let listener = TcpListener::bind(&addr).await?;
    info!("Sheet merger listening on http://{}", addr);
    info!(
        max_upload_bytes = config.server.max_upload_bytes,
        preview_rows = config.merge.preview_rows,
        cache_entries = config.merge.cache_entries,
        "Merge settings"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
