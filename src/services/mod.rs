//! Services layer - Business logic
//!
//! This module contains all business logic services for blogicum.
//! Services are responsible for:
//! - Implementing business rules (visibility, authorship, first-user admin)
//! - Coordinating between repositories
//! - Turning submitted forms into checked inputs

pub mod category;
pub mod comment;
pub mod form;
pub mod location;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod user;

pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use form::{
    CategoryForm, CommentForm, FormErrors, LocationForm, PostForm, ProfileForm, RegistrationForm,
};
pub use location::{LocationService, LocationServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostDetail, PostFormOptions, PostService, PostServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use user::{LoginInput, UserService, UserServiceError};
