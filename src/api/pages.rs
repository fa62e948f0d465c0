//! Static pages and HTML error pages
//!
//! - GET /pages/{name}/ - About and rules pages
//! - Fallback for unknown routes (404 page)
//! - Panic handler (500 page)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::any::Any;
use std::sync::Arc;

use crate::api::middleware::AppState;
use crate::theme::{PageRenderer, ThemeError};

/// Build the static pages router
pub fn router() -> Router<AppState> {
    Router::new().route("/pages/{name}/", get(static_page))
}

/// GET /pages/{name}/
async fn static_page(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.renderer.render_page(&name) {
        Ok(html) => Html(html).into_response(),
        Err(ThemeError::NotFound(_)) => not_found_page(&state.renderer),
        Err(e) => {
            tracing::error!("Failed to render page {}: {}", name, e);
            error_page(&state.renderer, StatusCode::INTERNAL_SERVER_ERROR, None)
        }
    }
}

/// Fallback for routes nothing else matched
pub async fn fallback(State(state): State<AppState>) -> Response {
    not_found_page(&state.renderer)
}

/// Render the 500 page for a handler that panicked
pub fn panic_response(renderer: &PageRenderer, panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);

    error_page(renderer, StatusCode::INTERNAL_SERVER_ERROR, None)
}

/// Panic handler usable with `CatchPanicLayer::custom`
pub fn panic_handler(
    renderer: Arc<PageRenderer>,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
    move |panic| panic_response(&renderer, panic)
}

fn not_found_page(renderer: &PageRenderer) -> Response {
    error_page(renderer, StatusCode::NOT_FOUND, None)
}

fn error_page(renderer: &PageRenderer, status: StatusCode, message: Option<&str>) -> Response {
    (status, Html(renderer.render_error(status.as_u16(), message))).into_response()
}
