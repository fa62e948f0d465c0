//! Profile API endpoints
//!
//! - GET /profile/{username}/ - Profile with the user's posts
//! - GET|POST /profile/edit/ - Own profile

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, Viewer};
use crate::api::responses::{ProfileResponse, ProfileView, UserResponse};
use crate::services::ProfileForm;

/// Build the profile router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/edit/", get(edit_form).post(edit_profile))
        .route("/profile/{username}/", get(profile))
}

/// GET /profile/{username}/
///
/// The owner sees every one of their posts; others only the visible ones.
async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (user, page) = state
        .post_service
        .list_profile(&username, viewer.user(), query.params())
        .await?;

    Ok(Json(ProfileResponse {
        profile: ProfileView::from(&user),
        is_owner: viewer.user().map_or(false, |v| v.id == user.id),
        listing: page.into(),
    }))
}

/// GET /profile/edit/
async fn edit_form(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(UserResponse { user })
}

/// POST /profile/edit/
async fn edit_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(form) = body?;
    let user = state.user_service.update_profile(&user, form).await?;
    Ok(Json(UserResponse { user }))
}
