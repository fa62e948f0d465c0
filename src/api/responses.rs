//! Shared API response types
//!
//! This module contains common response structures used across multiple API endpoints
//! to ensure consistency and reduce code duplication.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Category, Comment, Location, PagedResult, Post, User};

// ============================================================================
// Post Response Types
// ============================================================================

/// A post as clients see it
///
/// `is_published` is the effective state: the author's switch combined with
/// the publication date. A post dated in the future reports `false` and
/// `is_scheduled: true` until its time comes.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: String,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub is_published: bool,
    pub is_scheduled: bool,
    /// The author's own publish switch
    pub publish_switch: bool,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

impl PostView {
    pub fn new(post: Post, now: DateTime<Utc>) -> Self {
        Self {
            is_published: post.is_live_at(now),
            is_scheduled: post.is_scheduled_at(now),
            publish_switch: post.is_published,
            id: post.id,
            title: post.title,
            text: post.text,
            pub_date: post.pub_date,
            author: post.author_username,
            category_id: post.category_id,
            location_id: post.location_id,
            image: post.image,
            comment_count: post.comment_count,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post: PostView,
}

impl PostResponse {
    pub fn new(post: Post) -> Self {
        Self {
            post: PostView::new(post, Utc::now()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: PostView,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Serialize)]
pub struct PostFormOptionsResponse {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

// ============================================================================
// Pagination Response Types
// ============================================================================

/// Page metadata attached to every listing
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub number: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> From<&PagedResult<T>> for PageMeta {
    fn from(page: &PagedResult<T>) -> Self {
        Self {
            number: page.page,
            per_page: page.per_page,
            total_items: page.total,
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            has_previous: page.has_prev(),
        }
    }
}

/// Paginated post listing
#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostView>,
    pub pagination: PageMeta,
}

impl From<PagedResult<Post>> for PostListResponse {
    fn from(page: PagedResult<Post>) -> Self {
        let now = Utc::now();
        let pagination = PageMeta::from(&page);
        Self {
            posts: page.items.into_iter().map(|p| PostView::new(p, now)).collect(),
            pagination,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryPostsResponse {
    pub category: Category,
    #[serde(flatten)]
    pub listing: PostListResponse,
}

// ============================================================================
// User Response Types
// ============================================================================

/// Public profile, without contact details
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            display_name: user.display_name(),
            date_joined: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: ProfileView,
    pub is_owner: bool,
    #[serde(flatten)]
    pub listing: PostListResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;
    use chrono::Duration;

    fn post(pub_date: DateTime<Utc>) -> Post {
        Post {
            id: 1,
            title: "t".to_string(),
            text: "x".to_string(),
            pub_date,
            author_id: 1,
            author_username: "writer".to_string(),
            location_id: None,
            category_id: None,
            category_published: None,
            image: None,
            is_published: true,
            created_at: pub_date,
            comment_count: 0,
        }
    }

    #[test]
    fn test_scheduled_post_reports_unpublished() {
        let now = Utc::now();
        let view = PostView::new(post(now + Duration::hours(1)), now);

        assert!(!view.is_published);
        assert!(view.is_scheduled);
        assert!(view.publish_switch);
    }

    #[test]
    fn test_page_meta() {
        let page = PagedResult::new(vec![1, 2, 3, 4, 5], 25, &ListParams::new(3, 10));
        let meta = PageMeta::from(&page);

        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_next);
        assert!(meta.has_previous);
    }
}
