//! Leadboard API Service
//!
//! Admin dashboard backend for onboarding leads: the lead table, lead
//! details with their uploaded documents, and the analytics cards.

pub mod auth;
pub mod blob_store;
pub mod config;
pub mod handlers;
pub mod multipart;
pub mod scripts;
pub mod service;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use auth::Session;
pub use blob_store::RedisBlobStore;
pub use config::Config;
pub use handlers::{ApiError, AppState};
pub use service::{LeadService, PageLimits, PartialCleanupWarning, WriteReport};
pub use storage::RedisLeadStore;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    let shared_state = Arc::new(state);

    let api = Router::new()
        .route(
            "/api/all-leads",
            get(handlers::list_leads_handler).post(handlers::create_lead_handler),
        )
        .route(
            "/api/all-leads/{id}",
            get(handlers::get_lead_handler)
                .put(handlers::update_lead_handler)
                .delete(handlers::delete_lead_handler),
        )
        .route(
            "/api/all-leads/{id}/status",
            patch(handlers::set_status_handler),
        )
        .route(
            "/api/all-leads/files/{blob_id}",
            get(handlers::get_file_handler),
        )
        .route(
            "/api/analytics/leads",
            get(handlers::monthly_analytics_handler),
        )
        .route(
            "/api/analytics/summary",
            get(handlers::status_summary_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            shared_state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .merge(api)
        .with_state(shared_state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
