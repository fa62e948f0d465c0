//! Post API endpoints
//!
//! - GET / - Public post listing
//! - GET /posts/{id}/ - Post detail with comments
//! - GET|POST /posts/create/ - Post form options / create a post
//! - GET|POST /posts/{id}/edit/ - Current post / replace it (author only)
//! - GET|POST /posts/{id}/delete/ - Confirmation / delete (author only)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, Viewer};
use crate::api::responses::{
    PostDetailResponse, PostFormOptionsResponse, PostListResponse, PostResponse, PostView,
};
use crate::services::PostForm;

/// Build the post router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/posts/create/", get(create_form).post(create_post))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/edit/", get(edit_form).post(edit_post))
        .route("/posts/{id}/delete/", get(delete_confirm).post(delete_post))
}

/// GET / - Paginated public listing
async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let page = state.post_service.list_public(query.params()).await?;
    Ok(Json(page.into()))
}

/// GET /posts/{id}/
///
/// Hidden posts are 404 for everyone but their author.
async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PostDetailResponse>, ApiError> {
    let Path(id) = path?;
    let detail = state.post_service.get_for_viewer(id, viewer.user()).await?;

    Ok(Json(PostDetailResponse {
        post: PostView::new(detail.post, Utc::now()),
        comments: detail.comments,
    }))
}

/// GET /posts/create/ - Categories and locations to pick from
async fn create_form(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Result<Json<PostFormOptionsResponse>, ApiError> {
    let options = state.post_service.form_options().await?;
    Ok(Json(PostFormOptionsResponse {
        categories: options.categories,
        locations: options.locations,
    }))
}

/// POST /posts/create/
async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<PostForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = body?;
    let post = state.post_service.create(&user, form).await?;

    Ok((StatusCode::CREATED, Json(PostResponse::new(post))))
}

/// GET /posts/{id}/edit/
async fn edit_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PostResponse>, ApiError> {
    let Path(id) = path?;
    let post = state.post_service.get_owned(id, &user).await?;
    Ok(Json(PostResponse::new(post)))
}

/// POST /posts/{id}/edit/
async fn edit_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<PostForm>, JsonRejection>,
) -> Result<Json<PostResponse>, ApiError> {
    let Path(id) = path?;
    let Json(form) = body?;
    let post = state.post_service.edit(id, &user, form).await?;
    Ok(Json(PostResponse::new(post)))
}

/// GET /posts/{id}/delete/
async fn delete_confirm(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PostResponse>, ApiError> {
    let Path(id) = path?;
    let post = state.post_service.get_owned(id, &user).await?;
    Ok(Json(PostResponse::new(post)))
}

/// POST /posts/{id}/delete/ - Removes the post and its comments
async fn delete_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.post_service.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
