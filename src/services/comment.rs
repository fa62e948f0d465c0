//! Comment service
//!
//! Adding a comment needs a post the actor can read. Editing and deleting is
//! reserved for the comment's author; anyone else gets the configured denial.

use crate::config::DenialPolicy;
use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, Post, User};
use crate::services::form::{CommentForm, FormErrors};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Post or comment not found, or the comment belongs to another post
    #[error("Not found: {0}")]
    NotFound(String),

    /// Acting user is not the comment's author
    #[error("Only the author may change comment {comment_id}")]
    Denied {
        post_id: i64,
        comment_id: i64,
        policy: DenialPolicy,
    },

    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    denial: DenialPolicy,
}

impl CommentService {
    /// Create a new comment service answering non-authors with 403
    pub fn new(repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self {
            repo,
            post_repo,
            denial: DenialPolicy::Forbidden,
        }
    }

    pub fn with_denial_policy(mut self, denial: DenialPolicy) -> Self {
        self.denial = denial;
        self
    }

    /// Comment on a post the actor can read
    pub async fn add(
        &self,
        post_id: i64,
        actor: &User,
        form: CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        let post = self.get_post(post_id).await?;
        if !post.is_readable_by(Some(actor.id), Utc::now()) {
            return Err(CommentServiceError::NotFound(format!("post {}", post_id)));
        }

        let text = form.clean().map_err(CommentServiceError::ValidationError)?;
        let comment = self
            .repo
            .create(post.id, actor.id, &text)
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, post_id, author_id = actor.id, "Comment added");
        Ok(comment)
    }

    /// A comment on `post_id` that the actor wrote
    pub async fn get_owned(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &User,
    ) -> Result<Comment, CommentServiceError> {
        self.get_post(post_id).await?;

        let comment = self
            .repo
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .filter(|comment| comment.post_id == post_id)
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment_id)))?;

        if !comment.is_authored_by(actor.id) {
            tracing::warn!(comment_id, user_id = actor.id, "Denied change to foreign comment");
            return Err(CommentServiceError::Denied {
                post_id,
                comment_id,
                policy: self.denial,
            });
        }

        Ok(comment)
    }

    pub async fn edit(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &User,
        form: CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        self.get_owned(post_id, comment_id, actor).await?;
        let text = form.clean().map_err(CommentServiceError::ValidationError)?;

        let comment = self
            .repo
            .update_text(comment_id, &text)
            .await
            .context("Failed to update comment")?;
        Ok(comment)
    }

    pub async fn delete(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &User,
    ) -> Result<(), CommentServiceError> {
        self.get_owned(post_id, comment_id, actor).await?;

        self.repo
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;

        tracing::info!(comment_id, post_id, "Comment deleted");
        Ok(())
    }

    async fn get_post(&self, post_id: i64) -> Result<Post, CommentServiceError> {
        self.post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("post {}", post_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_post, insert_post_with, insert_user, setup_pool};
    use crate::db::repositories::{CommentRepositoryImpl, SqlxPostRepository};
    use crate::db::DynDatabasePool;
    use crate::models::PostInput;
    use chrono::Duration;

    fn service(pool: &DynDatabasePool) -> CommentService {
        CommentService::new(
            CommentRepositoryImpl::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
        )
    }

    fn text(value: &str) -> CommentForm {
        CommentForm {
            text: Some(value.to_string()),
        }
    }

    #[tokio::test]
    async fn test_add_comment() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let reader = insert_user(&pool, "reader").await;
        let post = insert_post(&pool, &author, "Post", Utc::now()).await;
        let service = service(&pool);

        let comment = service.add(post.id, &reader, text("Great")).await.unwrap();
        assert_eq!(comment.author_username, "reader");

        assert!(matches!(
            service.add(post.id, &reader, text("")).await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.add(9999, &reader, text("Hello?")).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cannot_comment_on_hidden_post() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let reader = insert_user(&pool, "reader").await;
        let post = insert_post_with(
            &pool,
            &author,
            PostInput::new("Later", "b", Utc::now() + Duration::days(1)),
        )
        .await;
        let service = service(&pool);

        assert!(matches!(
            service.add(post.id, &reader, text("First")).await,
            Err(CommentServiceError::NotFound(_))
        ));
        assert!(service.add(post.id, &author, text("Note to self")).await.is_ok());
    }

    #[tokio::test]
    async fn test_non_author_cannot_edit_or_delete() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let other = insert_user(&pool, "other").await;
        let post = insert_post(&pool, &author, "Post", Utc::now()).await;
        let service = service(&pool);
        let comment = service.add(post.id, &author, text("Mine")).await.unwrap();

        let result = service.edit(post.id, comment.id, &other, text("Yours")).await;
        assert!(matches!(
            result,
            Err(CommentServiceError::Denied {
                policy: DenialPolicy::Forbidden,
                ..
            })
        ));
        assert!(matches!(
            service.delete(post.id, comment.id, &other).await,
            Err(CommentServiceError::Denied { .. })
        ));

        let unchanged = service.get_owned(post.id, comment.id, &author).await.unwrap();
        assert_eq!(unchanged.text, "Mine");
    }

    #[tokio::test]
    async fn test_comment_must_belong_to_post() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let first = insert_post(&pool, &author, "First", Utc::now()).await;
        let second = insert_post(&pool, &author, "Second", Utc::now()).await;
        let service = service(&pool);
        let comment = service.add(first.id, &author, text("On first")).await.unwrap();

        assert!(matches!(
            service.edit(second.id, comment.id, &author, text("moved")).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_author_edits_and_deletes() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "writer").await;
        let post = insert_post(&pool, &author, "Post", Utc::now()).await;
        let service = service(&pool);
        let comment = service.add(post.id, &author, text("typo")).await.unwrap();

        let edited = service.edit(post.id, comment.id, &author, text("fixed")).await.unwrap();
        assert_eq!(edited.text, "fixed");

        service.delete(post.id, comment.id, &author).await.unwrap();
        assert!(matches!(
            service.get_owned(post.id, comment.id, &author).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
