//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - `ApiError`, the single error type at the HTTP edge
//! - Session resolution (Bearer header or `session` cookie)
//! - Extractors for the current viewer, logged-in users and admins

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequestParts, Request, State,
    },
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{Config, DenialPolicy};
use crate::db::repositories::{
    CommentRepositoryImpl, SqlxCategoryRepository, SqlxLocationRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CategoryService, CategoryServiceError, CommentService, CommentServiceError, FormErrors,
    LocationService, LocationServiceError, PostService, PostServiceError, UserService,
    UserServiceError,
};
use crate::theme::PageRenderer;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Login page that anonymous users are sent to
pub const LOGIN_PATH: &str = "/auth/login/";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_service: Arc<CategoryService>,
    pub location_service: Arc<LocationService>,
    pub renderer: Arc<PageRenderer>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(pool: DynDatabasePool, config: &Config) -> anyhow::Result<Self> {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let comment_repo = CommentRepositoryImpl::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let location_repo = SqlxLocationRepository::boxed(pool.clone());

        let user_service =
            UserService::with_config(user_repo.clone(), session_repo, &config.auth);
        let post_service = PostService::new(
            post_repo.clone(),
            comment_repo.clone(),
            category_repo.clone(),
            location_repo.clone(),
            user_repo,
        )
        .with_denial_policy(config.authorization.post_denial);
        let comment_service = CommentService::new(comment_repo, post_repo)
            .with_denial_policy(config.authorization.comment_denial);

        Ok(Self {
            user_service: Arc::new(user_service),
            post_service: Arc::new(post_service),
            comment_service: Arc::new(comment_service),
            category_service: Arc::new(CategoryService::new(category_repo)),
            location_service: Arc::new(LocationService::new(location_repo)),
            renderer: Arc::new(PageRenderer::new()?),
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
    /// Redirect target for `REDIRECT` and `LOGIN_REQUIRED`
    #[serde(skip)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            location: None,
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
            location: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMITED", message)
    }

    /// 400 with per-field messages
    pub fn invalid_form(errors: FormErrors) -> Self {
        Self::field_errors("VALIDATION_ERROR", "Invalid input", errors)
    }

    /// 409 with per-field messages
    pub fn conflict(errors: FormErrors) -> Self {
        Self::field_errors("CONFLICT", "Already exists", errors)
    }

    fn field_errors(code: &str, message: &str, errors: FormErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or_default();
        Self::with_details(code, message, details)
    }

    /// 303 See Other to `location`
    pub fn redirect(location: impl Into<String>) -> Self {
        let location = location.into();
        let mut error = Self::new("REDIRECT", format!("See {}", location));
        error.location = Some(location);
        error
    }

    /// 303 to the login page, coming back to `next` afterwards
    pub fn login_required(next: &str) -> Self {
        let mut error = Self::new("LOGIN_REQUIRED", "Authentication required");
        error.location = Some(format!("{}?next={}", LOGIN_PATH, urlencoding::encode(next)));
        error
    }

    /// Denial of a change to someone else's resource
    pub fn denied(policy: DenialPolicy, detail_path: String, message: impl Into<String>) -> Self {
        match policy {
            DenialPolicy::Redirect => Self::redirect(detail_path),
            DenialPolicy::Forbidden => Self::forbidden(message),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", error);
        Self::internal_error("Internal server error")
    }

    fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            "REDIRECT" | "LOGIN_REQUIRED" => StatusCode::SEE_OTHER,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let location = self
            .location
            .as_deref()
            .and_then(|l| HeaderValue::from_str(l).ok());

        let mut response = (status, Json(self)).into_response();
        if let Some(location) = location {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

/// Ids that do not parse name nothing that exists
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::not_found(rejection.body_text())
    }
}

impl From<PostServiceError> for ApiError {
    fn from(error: PostServiceError) -> Self {
        match error {
            PostServiceError::NotFound(what) => Self::not_found(format!("Not found: {}", what)),
            PostServiceError::Denied { post_id, policy } => Self::denied(
                policy,
                format!("/posts/{}/", post_id),
                "Only the author can change this post",
            ),
            PostServiceError::ValidationError(errors) => Self::invalid_form(errors),
            PostServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(error: CommentServiceError) -> Self {
        match error {
            CommentServiceError::NotFound(what) => Self::not_found(format!("Not found: {}", what)),
            CommentServiceError::Denied {
                post_id, policy, ..
            } => Self::denied(
                policy,
                format!("/posts/{}/", post_id),
                "Only the author can change this comment",
            ),
            CommentServiceError::ValidationError(errors) => Self::invalid_form(errors),
            CommentServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(error: CategoryServiceError) -> Self {
        match error {
            CategoryServiceError::NotFound(id) => Self::not_found(format!("Category not found: {}", id)),
            CategoryServiceError::DuplicateSlug(errors) => Self::conflict(errors),
            CategoryServiceError::ValidationError(errors) => Self::invalid_form(errors),
            CategoryServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<LocationServiceError> for ApiError {
    fn from(error: LocationServiceError) -> Self {
        match error {
            LocationServiceError::NotFound(id) => Self::not_found(format!("Location not found: {}", id)),
            LocationServiceError::ValidationError(errors) => Self::invalid_form(errors),
            LocationServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(error: UserServiceError) -> Self {
        match error {
            UserServiceError::AuthenticationError(message) => Self::unauthorized(message),
            UserServiceError::ValidationError(errors) => Self::invalid_form(errors),
            UserServiceError::UserExists(errors) => Self::conflict(errors),
            UserServiceError::RateLimited => {
                Self::rate_limited("Too many login attempts, try again later")
            }
            UserServiceError::NotFound(username) => {
                Self::not_found(format!("User not found: {}", username))
            }
            UserServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

// ============================================================================
// Session resolution
// ============================================================================

/// Extract session token from the Authorization header or the session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Optional authentication middleware
///
/// Resolves the session, if any, and stores the user in the request
/// extensions. Invalid or expired tokens leave the request anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

// ============================================================================
// Extractors
// ============================================================================

/// Authenticated user extracted from request
///
/// Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                ApiError::login_required(next)
            })
    }
}

/// Logged-in administrator; other users get 403
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = user.id, "Admin access denied");
            return Err(ApiError::forbidden("Admin privileges required"));
        }
        Ok(AdminUser(user))
    }
}

/// Whoever is looking, possibly nobody
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_from_bearer_and_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc"));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=nope; session=xyz"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("xyz"));

        assert!(extract_session_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_login_required_redirect() {
        let response = ApiError::login_required("/posts/create/?x=1").into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login/?next=%2Fposts%2Fcreate%2F%3Fx%3D1"
        );
    }

    #[test]
    fn test_denial_policies() {
        let redirect = ApiError::denied(DenialPolicy::Redirect, "/posts/3/".to_string(), "no")
            .into_response();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
        assert_eq!(redirect.headers()[header::LOCATION], "/posts/3/");

        let forbidden = ApiError::denied(DenialPolicy::Forbidden, "/posts/3/".to_string(), "no")
            .into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert!(forbidden.headers().get(header::LOCATION).is_none());
    }

    #[test]
    fn test_form_errors_become_details() {
        let error = ApiError::invalid_form(FormErrors::single("title", "This field is required."));
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["details"]["title"][0], "This field is required.");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }
}
