//! HTTP layer - handlers and routing
//!
//! Server-rendered pages:
//! - Feeds (front page, category, profile) and post detail
//! - Post, comment and profile forms
//! - Login, registration and logout
//! - Static pages and uploaded media
//!
//! plus the JSON moderation API under `/api/admin`.

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod profile;
pub mod responses;
pub mod upload;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Router};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

pub use middleware::{ApiError, AppState};

/// Room for the text fields sent along with an image
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the moderation API router (admin only)
pub fn build_admin_router() -> Router<AppState> {
    Router::new()
        .nest("/api/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .merge(posts::router().layer(DefaultBodyLimit::max(body_limit)))
        .merge(comments::router())
        .merge(categories::router())
        .merge(profile::router())
        .merge(auth::router())
        .merge(pages::router())
        .merge(build_admin_router())
        .nest_service("/media", ServeDir::new(&state.upload_config.path))
        .fallback(responses::not_found)
        .layer(axum_middleware::from_fn(middleware::reject_cross_origin))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            responses::render_error_pages,
        ))
        // Outermost app layer: everything below sees the viewer
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
