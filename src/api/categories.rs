//! Category API endpoints
//!
//! Handles HTTP requests for category listings:
//! - GET /category/{slug}/ - Visible posts of a published category

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::CategoryPostsResponse;

/// Build the category router
pub fn router() -> Router<AppState> {
    Router::new().route("/category/{slug}/", get(category_posts))
}

/// GET /category/{slug}/
///
/// Unknown and unpublished categories are both 404.
async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryPostsResponse>, ApiError> {
    let (category, page) = state
        .post_service
        .list_category(&slug, query.params())
        .await?;

    Ok(Json(CategoryPostsResponse {
        category,
        listing: page.into(),
    }))
}
