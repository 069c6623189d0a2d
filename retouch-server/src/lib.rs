//! retouch-server library interface
//!
//! Exposes the application state, router construction, and the image
//! editing pipeline for integration testing.

pub mod api;
pub mod pipeline;
pub mod services;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use retouch_common::config::Config;
use retouch_common::Result;

use crate::pipeline::artifacts::ArtifactStore;
use crate::pipeline::Pipeline;
use crate::services::fetch::ImageFetcher;
use crate::services::generation::GenerationService;

/// Maximum accepted request body size.
///
/// Edit requests may carry large point sets and the legacy clients send
/// bodies up to 50 MB.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Process-wide immutable configuration
    pub config: Arc<Config>,
    /// Edit/variation pipeline, one run per request
    pub pipeline: Arc<Pipeline>,
    /// Remote generation client (injected, substitutable in tests)
    pub generator: Arc<dyn GenerationService>,
    /// Source image downloader, shared with the pipeline
    pub fetcher: ImageFetcher,
}

impl AppState {
    /// Create application state around an injected generation client
    pub fn new(config: Config, generator: Arc<dyn GenerationService>) -> Result<Self> {
        let fetcher = ImageFetcher::new()?;
        let artifacts = Arc::new(ArtifactStore::new(config.working_dir.clone()));
        let pipeline = Arc::new(Pipeline::new(
            fetcher.clone(),
            Arc::clone(&generator),
            artifacts,
        ));

        Ok(Self {
            config: Arc::new(config),
            pipeline,
            generator,
            fetcher,
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::post;

    Router::new()
        .route("/edit", post(api::images::edit_image))
        .route("/variations", post(api::images::image_variations))
        .route("/generate", post(api::images::create_images))
        .route("/save", post(api::images::save_image))
        .merge(api::health::health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
