//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints for blogicum.
//! It includes:
//! - Post listing, detail and authoring endpoints
//! - Category listing endpoint
//! - Comment endpoints
//! - Profile endpoints
//! - Auth endpoints
//! - Admin endpoints for categories and locations
//! - Static pages and HTML error pages

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

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    trace::TraceLayer,
};

pub use middleware::{AdminUser, ApiError, AppState, AuthenticatedUser, Viewer};

/// Build the route table without the outer layers
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(posts::router())
        .merge(comments::router())
        .merge(categories::router())
        .merge(profile::router())
        .merge(pages::router())
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    // CORS configuration with cookie credentials
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin: {}", cors_origin),
    }

    Router::new()
        .merge(build_api_router())
        .fallback(pages::fallback)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::custom(pages::panic_handler(
            state.renderer.clone(),
        )))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
