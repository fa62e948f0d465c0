//! Post service
//!
//! Implements business logic for posts:
//! - Public, category and profile listings, paginated and filtered by the
//!   visibility rule as of the request time
//! - Post detail with comments; authors always see their own posts
//! - Create, edit and delete, restricted to the post's author
//!
//! Listings are never cached: a scheduled post must appear as soon as its
//! publication time passes.

use crate::config::DenialPolicy;
use crate::db::repositories::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository, UserRepository,
};
use crate::models::{
    Category, Comment, ListParams, Location, PagedResult, Post, PostInput, PostScope, User,
};
use crate::services::form::{FormErrors, PostForm};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post, category or profile not found (or not visible to the viewer)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Acting user is not the post's author
    #[error("Only the author may change post {post_id}")]
    Denied { post_id: i64, policy: DenialPolicy },

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A post together with its comments, oldest comment first
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Choices offered by the post form
#[derive(Debug, Clone, Serialize)]
pub struct PostFormOptions {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    location_repo: Arc<dyn LocationRepository>,
    user_repo: Arc<dyn UserRepository>,
    denial: DenialPolicy,
}

impl PostService {
    /// Create a new post service denying non-authors with a redirect
    pub fn new(
        repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        location_repo: Arc<dyn LocationRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            repo,
            comment_repo,
            category_repo,
            location_repo,
            user_repo,
            denial: DenialPolicy::Redirect,
        }
    }

    /// Use a different response for non-author changes
    pub fn with_denial_policy(mut self, denial: DenialPolicy) -> Self {
        self.denial = denial;
        self
    }

    /// Paginated listing of every publicly visible post
    pub async fn list_public(
        &self,
        params: ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        self.list_scope(PostScope::Public, params, Utc::now()).await
    }

    /// Paginated listing of a published category's visible posts
    pub async fn list_category(
        &self,
        slug: &str,
        params: ListParams,
    ) -> Result<(Category, PagedResult<Post>), PostServiceError> {
        let category = self
            .category_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category")?
            .filter(|category| category.is_published)
            .ok_or_else(|| PostServiceError::NotFound(format!("category '{}'", slug)))?;

        let page = self
            .list_scope(PostScope::Category(category.id), params, Utc::now())
            .await?;
        Ok((category, page))
    }

    /// Paginated listing of a user's posts
    ///
    /// The owner sees all of them, including unpublished and scheduled ones.
    pub async fn list_profile(
        &self,
        username: &str,
        viewer: Option<&User>,
        params: ListParams,
    ) -> Result<(User, PagedResult<Post>), PostServiceError> {
        let profile = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get profile")?
            .ok_or_else(|| PostServiceError::NotFound(format!("profile '{}'", username)))?;

        let scope = PostScope::Author {
            author_id: profile.id,
            include_hidden: viewer.map_or(false, |v| v.id == profile.id),
        };
        let page = self.list_scope(scope, params, Utc::now()).await?;
        Ok((profile, page))
    }

    /// Post detail as seen by `viewer`
    pub async fn get_for_viewer(
        &self,
        id: i64,
        viewer: Option<&User>,
    ) -> Result<PostDetail, PostServiceError> {
        let post = self.get_readable(id, viewer, Utc::now()).await?;
        let comments = self
            .comment_repo
            .list_by_post(post.id)
            .await
            .context("Failed to list comments")?;

        Ok(PostDetail { post, comments })
    }

    /// A post the actor is allowed to change
    pub async fn get_owned(&self, id: i64, actor: &User) -> Result<Post, PostServiceError> {
        let post = self.get_existing(id).await?;
        if !post.is_authored_by(actor.id) {
            tracing::warn!(post_id = id, user_id = actor.id, "Denied change to foreign post");
            return Err(PostServiceError::Denied {
                post_id: id,
                policy: self.denial,
            });
        }
        Ok(post)
    }

    /// Published categories and locations for the post form
    pub async fn form_options(&self) -> Result<PostFormOptions, PostServiceError> {
        let categories = self
            .category_repo
            .list_published()
            .await
            .context("Failed to list categories")?;
        let locations = self
            .location_repo
            .list(true)
            .await
            .context("Failed to list locations")?;

        Ok(PostFormOptions {
            categories,
            locations,
        })
    }

    /// Create a post written by `actor`
    pub async fn create(&self, actor: &User, form: PostForm) -> Result<Post, PostServiceError> {
        let input = self.clean(form).await?;

        let post = self
            .repo
            .create(actor.id, &input)
            .await
            .context("Failed to create post")?;

        tracing::info!(
            post_id = post.id,
            author_id = actor.id,
            scheduled = post.is_scheduled_at(Utc::now()),
            "Post created"
        );
        Ok(post)
    }

    /// Replace a post's fields; author only
    pub async fn edit(&self, id: i64, actor: &User, form: PostForm) -> Result<Post, PostServiceError> {
        self.get_owned(id, actor).await?;
        let input = self.clean(form).await?;

        let post = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update post")?;

        tracing::info!(post_id = id, "Post updated");
        Ok(post)
    }

    /// Delete a post and its comments; author only
    pub async fn delete(&self, id: i64, actor: &User) -> Result<(), PostServiceError> {
        self.get_owned(id, actor).await?;

        let deleted = self.repo.delete(id).await.context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::NotFound(format!("post {}", id)));
        }

        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn list_scope(
        &self,
        scope: PostScope,
        params: ListParams,
        now: DateTime<Utc>,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let total = self
            .repo
            .count(scope, now)
            .await
            .context("Failed to count posts")?;
        let params = params.clamp_to(total);

        let items = self
            .repo
            .list(scope, now, params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;

        Ok(PagedResult::new(items, total, &params))
    }

    async fn get_existing(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))
    }

    /// A post readable by the viewer; hidden posts look missing to non-authors
    pub(crate) async fn get_readable(
        &self,
        id: i64,
        viewer: Option<&User>,
        now: DateTime<Utc>,
    ) -> Result<Post, PostServiceError> {
        let post = self.get_existing(id).await?;
        if !post.is_readable_by(viewer.map(|v| v.id), now) {
            return Err(PostServiceError::NotFound(format!("post {}", id)));
        }
        Ok(post)
    }

    /// Form checks plus the lookups they need
    async fn clean(&self, form: PostForm) -> Result<PostInput, PostServiceError> {
        let mut errors = FormErrors::new();

        // Reference checks use the raw form so they are reported alongside field errors
        if let Some(category_id) = form.category_id {
            if self
                .category_repo
                .get_by_id(category_id)
                .await
                .context("Failed to check category")?
                .is_none()
            {
                errors.add("category_id", "Select a valid choice.");
            }
        }

        if let Some(location_id) = form.location_id {
            if self
                .location_repo
                .get_by_id(location_id)
                .await
                .context("Failed to check location")?
                .is_none()
            {
                errors.add("location_id", "Select a valid choice.");
            }
        }

        match form.clean() {
            Ok(input) if errors.is_empty() => Ok(input),
            Ok(_) => Err(PostServiceError::ValidationError(errors)),
            Err(field_errors) => {
                errors.extend(field_errors);
                Err(PostServiceError::ValidationError(errors))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_category, insert_location, insert_post, insert_post_with, insert_user, setup_pool,
    };
    use crate::db::repositories::{
        CommentRepositoryImpl, SqlxCategoryRepository, SqlxLocationRepository, SqlxPostRepository,
        SqlxUserRepository,
    };
    use crate::db::DynDatabasePool;
    use chrono::Duration;

    fn service(pool: &DynDatabasePool) -> PostService {
        PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            CommentRepositoryImpl::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxLocationRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
        )
    }

    fn form(title: &str, pub_date: DateTime<Utc>) -> PostForm {
        PostForm {
            title: Some(title.to_string()),
            text: Some("Body".to_string()),
            pub_date: Some(pub_date.to_rfc3339()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_public_listing_pages() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let now = Utc::now();
        for i in 0..25 {
            insert_post(&pool, &author, &format!("post {}", i), now - Duration::minutes(i + 1)).await;
        }
        let service = service(&pool);

        let first = service.list_public(ListParams::from_query(None)).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first.items[0].title, "post 0");
        assert_eq!(first.total_pages(), 3);

        let beyond = service.list_public(ListParams::from_query(Some("4"))).await.unwrap();
        assert_eq!(beyond.page, 3);
        assert_eq!(beyond.len(), 5);
        assert_eq!(beyond.items[4].title, "post 24");

        let junk = service.list_public(ListParams::from_query(Some("abc"))).await.unwrap();
        assert_eq!(junk.page, 1);
    }

    #[tokio::test]
    async fn test_scheduled_post_hidden_until_due() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let service = service(&pool);

        let created = service
            .create(&author, form("Later", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        assert!(!created.is_live_at(Utc::now()));
        assert!(created.is_published);
        assert!(service.list_public(ListParams::default()).await.unwrap().is_empty());

        let stranger = insert_user(&pool, "stranger").await;
        assert!(matches!(
            service.get_for_viewer(created.id, Some(&stranger)).await,
            Err(PostServiceError::NotFound(_))
        ));
        assert!(service.get_for_viewer(created.id, Some(&author)).await.is_ok());
    }

    #[tokio::test]
    async fn test_category_listing_requires_published_category() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let travel = insert_category(&pool, "travel", true).await;
        insert_category(&pool, "secret", false).await;
        insert_post_with(
            &pool,
            &author,
            PostInput::new("Trip", "b", Utc::now() - Duration::hours(1)).with_category(travel.id),
        )
        .await;
        let service = service(&pool);

        let (category, page) = service.list_category("travel", ListParams::default()).await.unwrap();
        assert_eq!(category.id, travel.id);
        assert_eq!(page.total, 1);

        for slug in ["secret", "missing"] {
            assert!(matches!(
                service.list_category(slug, ListParams::default()).await,
                Err(PostServiceError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_profile_owner_sees_hidden_posts() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let reader = insert_user(&pool, "reader").await;
        insert_post(&pool, &author, "visible", Utc::now() - Duration::hours(1)).await;
        insert_post_with(
            &pool,
            &author,
            PostInput::new("draft", "b", Utc::now()).with_published(false),
        )
        .await;
        let service = service(&pool);

        let (_, own) = service
            .list_profile("writer", Some(&author), ListParams::default())
            .await
            .unwrap();
        assert_eq!(own.total, 2);

        let (_, theirs) = service
            .list_profile("writer", Some(&reader), ListParams::default())
            .await
            .unwrap();
        assert_eq!(theirs.total, 1);

        let (_, anonymous) = service
            .list_profile("writer", None, ListParams::default())
            .await
            .unwrap();
        assert_eq!(anonymous.total, 1);
    }

    #[tokio::test]
    async fn test_non_author_edit_is_denied_and_post_unchanged() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let other = insert_user(&pool, "other").await;
        let post = insert_post(&pool, &author, "Original", Utc::now()).await;
        let service = service(&pool);

        let result = service.edit(post.id, &other, form("Hijacked", Utc::now())).await;
        match result {
            Err(PostServiceError::Denied { post_id, policy }) => {
                assert_eq!(post_id, post.id);
                assert_eq!(policy, DenialPolicy::Redirect);
            }
            other => panic!("expected Denied, got {:?}", other),
        }

        let detail = service.get_for_viewer(post.id, None).await.unwrap();
        assert_eq!(detail.post.title, "Original");

        let forbidding = self::service(&pool).with_denial_policy(DenialPolicy::Forbidden);
        assert!(matches!(
            forbidding.delete(post.id, &other).await,
            Err(PostServiceError::Denied {
                policy: DenialPolicy::Forbidden,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_create_validates_references() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let location = insert_location(&pool, "Moscow").await;
        let service = service(&pool);

        let mut bad = form("Title", Utc::now());
        bad.category_id = Some(999);
        bad.location_id = Some(location.id);
        match service.create(&author, bad).await {
            Err(PostServiceError::ValidationError(errors)) => {
                assert!(errors.has("category_id"));
                assert!(!errors.has("location_id"));
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }

        let mut good = form("Title", Utc::now());
        good.location_id = Some(location.id);
        let post = service.create(&author, good).await.unwrap();
        assert_eq!(post.location_id, Some(location.id));
    }

    #[tokio::test]
    async fn test_create_reports_field_and_reference_errors_together() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let service = service(&pool);

        let mut bad = form("", Utc::now());
        bad.category_id = Some(999);
        bad.location_id = Some(998);
        match service.create(&author, bad).await {
            Err(PostServiceError::ValidationError(errors)) => {
                assert!(errors.has("title"));
                assert!(errors.has("category_id"));
                assert!(errors.has("location_id"));
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }

        let total = service.list_public(ListParams::default()).await.unwrap().total;
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_author_edits_and_deletes() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let post = insert_post(&pool, &author, "Before", Utc::now()).await;
        let service = service(&pool);

        let edited = service.edit(post.id, &author, form("After", post.pub_date)).await.unwrap();
        assert_eq!(edited.title, "After");

        service.delete(post.id, &author).await.unwrap();
        assert!(matches!(
            service.get_for_viewer(post.id, Some(&author)).await,
            Err(PostServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_form_options_only_published() {
        let pool = setup_pool().await;
        insert_category(&pool, "open", true).await;
        insert_category(&pool, "closed", false).await;
        insert_location(&pool, "Moscow").await;
        let service = service(&pool);

        let options = service.form_options().await.unwrap();
        assert_eq!(options.categories.len(), 1);
        assert_eq!(options.categories[0].slug, "open");
        assert_eq!(options.locations.len(), 1);
    }
}
