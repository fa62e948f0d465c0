//! Post model
//!
//! This module provides:
//! - `Post` entity with the joined author name, category flag and comment count
//! - The read-time visibility rules
//! - `PostInput` for creating and editing posts
//! - `PostScope` selecting which listing to page through

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum title length in characters
pub const TITLE_MAX_LEN: usize = 256;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Title
    pub title: String,
    /// Body text
    pub text: String,
    /// Publication timestamp; may lie in the future
    pub pub_date: DateTime<Utc>,
    /// Author user ID
    pub author_id: i64,
    /// Author username (joined)
    pub author_username: String,
    /// Location ID
    pub location_id: Option<i64>,
    /// Category ID
    pub category_id: Option<i64>,
    /// Whether the category is published (joined, `None` without a category)
    pub category_published: Option<bool>,
    /// Image reference
    pub image: Option<String>,
    /// Publish switch controlled by the author
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Number of comments
    #[serde(default)]
    pub comment_count: i64,
}

impl Post {
    /// Published flag combined with the publication date.
    ///
    /// This is what clients see as "published": a post dated in the future is
    /// not live yet even if its switch is on.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.pub_date <= now
    }

    /// Scheduled for later publication
    pub fn is_scheduled_at(&self, now: DateTime<Utc>) -> bool {
        self.pub_date > now
    }

    /// Public visibility at `now`: live and not hidden through its category
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_live_at(now) && self.category_published.unwrap_or(true)
    }

    /// Check whether `user_id` wrote this post
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }

    /// Whether a viewer may read this post: authors always see their own
    pub fn is_readable_by(&self, viewer_id: Option<i64>, now: DateTime<Utc>) -> bool {
        viewer_id.map_or(false, |id| self.is_authored_by(id)) || self.is_visible_at(now)
    }
}

/// Checked input for creating or replacing a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub image: Option<String>,
    pub is_published: bool,
}

impl PostInput {
    /// Create a new input; published, without category or location
    pub fn new(title: impl Into<String>, text: impl Into<String>, pub_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            pub_date,
            category_id: None,
            location_id: None,
            image: None,
            is_published: true,
        }
    }

    /// Set the category
    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Set the location
    pub fn with_location(mut self, location_id: i64) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Set the image reference
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the publish switch
    pub fn with_published(mut self, is_published: bool) -> Self {
        self.is_published = is_published;
        self
    }
}

/// Which set of posts a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Every publicly visible post
    Public,
    /// Visible posts in one category
    Category(i64),
    /// One author's posts; `include_hidden` shows unpublished and scheduled ones too
    Author { author_id: i64, include_hidden: bool },
}
