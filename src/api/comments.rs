//! Comment API endpoints
//!
//! - POST /posts/{id}/comment/ - Add a comment
//! - GET|POST /posts/{id}/edit_comment/{comment_id}/ - Edit (author only)
//! - GET|POST /posts/{id}/delete_comment/{comment_id}/ - Delete (author only)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Comment;
use crate::services::CommentForm;

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: Comment,
}

/// Build the comment router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comment/", post(add_comment))
        .route(
            "/posts/{id}/edit_comment/{comment_id}/",
            get(get_own_comment).post(edit_comment),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}/",
            get(get_own_comment).post(delete_comment),
        )
}

async fn add_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CommentForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(post_id) = path?;
    let Json(form) = body?;
    let comment = state.comment_service.add(post_id, &user, form).await?;

    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

/// Shown before editing or deleting
async fn get_own_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<CommentResponse>, ApiError> {
    let Path((post_id, comment_id)) = path?;
    let comment = state
        .comment_service
        .get_owned(post_id, comment_id, &user)
        .await?;
    Ok(Json(CommentResponse { comment }))
}

async fn edit_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<(i64, i64)>, PathRejection>,
    body: Result<Json<CommentForm>, JsonRejection>,
) -> Result<Json<CommentResponse>, ApiError> {
    let Path((post_id, comment_id)) = path?;
    let Json(form) = body?;
    let comment = state
        .comment_service
        .edit(post_id, comment_id, &user, form)
        .await?;
    Ok(Json(CommentResponse { comment }))
}

async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((post_id, comment_id)) = path?;
    state
        .comment_service
        .delete(post_id, comment_id, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
