//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for saving, locating, reading and deleting media by tag
//! - Mapping of storage errors to explicit HTTP statuses

pub mod error;
pub mod routes;

use axum::Router;
use mediakit_core::MediaFacade;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Tag-level media operations.
    pub media: Arc<MediaFacade>,
}

impl AppState {
    /// Create state around a media facade.
    #[must_use]
    pub fn new(media: MediaFacade) -> Self {
        Self {
            media: Arc::new(media),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
