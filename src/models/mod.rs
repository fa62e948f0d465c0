//! Data models
//!
//! Database entities (Post, Category, Location, Comment, User, Session), the
//! checked inputs that create them, and the pagination types shared by every
//! listing.

mod category;
mod comment;
mod location;
mod pagination;
mod post;
mod session;
mod user;

pub use category::{Category, CategoryInput};
pub use comment::Comment;
pub use location::{Location, LocationInput};
pub use pagination::{ListParams, PagedResult, PAGE_SIZE};
pub use post::{Post, PostInput, PostScope, TITLE_MAX_LEN};
pub use session::Session;
pub use user::{CreateUserInput, UpdateProfileInput, User, UserRole};
