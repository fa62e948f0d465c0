//! Authentication API endpoints
//!
//! Handles HTTP requests for user authentication:
//! - POST /auth/registration/ - User registration
//! - POST /auth/login/ - User login
//! - POST /auth/logout/ - User logout
//! - GET /auth/me/ - Get current user

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::NextQuery;
use crate::api::middleware::{
    extract_session_token, ApiError, AppState, Viewer, SESSION_COOKIE,
};
use crate::api::responses::UserResponse;
use crate::models::User;
use crate::services::{LoginInput, RegistrationForm};

/// Response for successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    /// Where the client should go next
    pub next: String,
}

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/registration/", post(register))
        .route("/login/", post(login))
        .route("/logout/", post(logout))
        .route("/me/", get(get_current_user))
}

fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    HeaderValue::from_str(&cookie).map_err(|_| ApiError::internal_error("Invalid session cookie"))
}

/// POST /auth/registration/ - User registration
///
/// The first registered user becomes the administrator.
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegistrationForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = body?;
    let user = state.user_service.register(form).await?;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// POST /auth/login/ - User login
///
/// Returns the session token and also sets it as an HttpOnly cookie.
async fn login(
    State(state): State<AppState>,
    Query(next): Query<NextQuery>,
    body: Result<Json<LoginInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = body?;
    let (session, user) = state.user_service.login(input).await?;

    let max_age = state.user_service.session_days() * 24 * 60 * 60;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&session.id, max_age)?);

    Ok((
        headers,
        Json(LoginResponse {
            user,
            token: session.id,
            next: next.target(),
        }),
    ))
}

/// POST /auth/logout/ - User logout
///
/// Always succeeds; an unknown or missing session just clears the cookie.
async fn logout(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&request_headers) {
        state.user_service.logout(&token).await?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie("", 0)?);

    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /auth/me/ - Get current user
async fn get_current_user(Viewer(viewer): Viewer) -> Result<Json<UserResponse>, ApiError> {
    let user = viewer.ok_or_else(|| ApiError::unauthorized("Not logged in"))?;
    Ok(Json(UserResponse { user }))
}
