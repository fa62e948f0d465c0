//! User service
//!
//! Implements business logic for user management:
//! - Registration (first user becomes admin)
//! - Login with per-username rate limiting, logout
//! - Session validation; expired sessions are deleted and treated as anonymous
//! - Profile lookup and editing

use crate::config::AuthConfig;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::form::{FormErrors, ProfileForm, RegistrationForm};
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(FormErrors),

    /// Too many failed logins for this username
    #[error("Too many login attempts")]
    RateLimited,

    /// User not found
    #[error("User not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
    rate_limiter: LoginRateLimiter,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
            rate_limiter: LoginRateLimiter::default(),
        }
    }

    /// Create a new user service with session lifetime and login limits from config
    pub fn with_config(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: config.session_days,
            rate_limiter: LoginRateLimiter::new(
                config.login_max_attempts,
                Duration::minutes(config.login_window_minutes),
            ),
        }
    }

    /// Register a new user
    ///
    /// If this is the first user in the system, they will automatically
    /// be assigned the Admin role.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the form does not validate
    /// - `UserExists` if the username is already taken
    /// - `InternalError` for database errors
    pub async fn register(&self, form: RegistrationForm) -> Result<User, UserServiceError> {
        let input = form.clean().map_err(UserServiceError::ValidationError)?;

        if self
            .user_repo
            .username_taken(&input.username, None)
            .await
            .context("Failed to check username")?
        {
            return Err(UserServiceError::UserExists(FormErrors::single(
                "username",
                "A user with that username already exists.",
            )));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::Author
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.username, input.email, password_hash, role);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, username = %created.username, role = %created.role, "User registered");
        Ok(created)
    }

    /// Login with credentials
    ///
    /// Validates the provided credentials and creates a new session if valid.
    ///
    /// # Errors
    ///
    /// - `RateLimited` after too many recent failures for the username
    /// - `AuthenticationError` if credentials are invalid
    /// - `InternalError` for database errors
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        if self.rate_limiter.is_limited(&input.username).await {
            tracing::warn!(username = %input.username, "Login rate limited");
            return Err(UserServiceError::RateLimited);
        }

        let user = self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to get user by username")?;

        let user = match user {
            Some(user)
                if verify_password(&input.password, &user.password_hash)
                    .context("Failed to verify password")? =>
            {
                user
            }
            _ => {
                self.rate_limiter.record_failure(&input.username).await;
                return Err(UserServiceError::AuthenticationError(
                    "Invalid username or password".to_string(),
                ));
            }
        };

        self.rate_limiter.clear(&input.username).await;
        let session = self.create_session(user.id).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((session, user))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Validate session token and return the associated user
    ///
    /// Returns `None` when the session doesn't exist or is expired; expired
    /// sessions are removed on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Check if this is the first user (for auto-admin)
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;

        Ok(count == 0)
    }

    /// Get user by username, failing with `NotFound`
    pub async fn get_by_username(&self, username: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| UserServiceError::NotFound(username.to_string()))
    }

    /// Update the acting user's own profile
    pub async fn update_profile(
        &self,
        user: &User,
        form: ProfileForm,
    ) -> Result<User, UserServiceError> {
        let input = form.clean().map_err(UserServiceError::ValidationError)?;

        if self
            .user_repo
            .username_taken(&input.username, Some(user.id))
            .await
            .context("Failed to check username")?
        {
            return Err(UserServiceError::UserExists(FormErrors::single(
                "username",
                "A user with that username already exists.",
            )));
        }

        let updated = self
            .user_repo
            .update_profile(user.id, &input)
            .await
            .context("Failed to update profile")?;

        tracing::info!(user_id = updated.id, "Profile updated");
        Ok(updated)
    }

    /// Delete expired sessions and stale rate-limit entries
    ///
    /// Returns the number of sessions deleted.
    pub async fn cleanup(&self) -> Result<u64, UserServiceError> {
        let sessions = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        let tracked = self.rate_limiter.cleanup().await;

        tracing::debug!(sessions, tracked, "Auth cleanup finished");
        Ok(sessions)
    }

    /// Session lifetime in days
    pub fn session_days(&self) -> i64 {
        self.session_expiration_days
    }

    /// Create a new session for a user
    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

/// Input for user login
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    /// Create a new login input
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
