//! Category service
//!
//! Admin management of categories:
//! - Create, list, update, delete
//! - Slug uniqueness
//! - Deleting a category detaches its posts instead of removing them

use crate::db::repositories::CategoryRepository;
use crate::models::Category;
use crate::services::form::{CategoryForm, FormErrors};
use anyhow::Context;
use std::sync::Arc;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Category slug already exists
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(FormErrors),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Every category, published or not
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    pub async fn create(&self, form: CategoryForm) -> Result<Category, CategoryServiceError> {
        let input = form.clean().map_err(CategoryServiceError::ValidationError)?;
        self.ensure_slug_free(&input.slug, None).await?;

        let category = self
            .repo
            .create(&input)
            .await
            .context("Failed to create category")?;

        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn update(&self, id: i64, form: CategoryForm) -> Result<Category, CategoryServiceError> {
        self.get_existing(id).await?;
        let input = form.clean().map_err(CategoryServiceError::ValidationError)?;
        self.ensure_slug_free(&input.slug, Some(id)).await?;

        let category = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update category")?;

        tracing::info!(category_id = id, "Category updated");
        Ok(category)
    }

    /// Delete a category; its posts lose their category
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete category")?;
        if !deleted {
            return Err(CategoryServiceError::NotFound(id.to_string()));
        }

        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }

    async fn get_existing(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    async fn ensure_slug_free(
        &self,
        slug: &str,
        except_id: Option<i64>,
    ) -> Result<(), CategoryServiceError> {
        if self
            .repo
            .exists_by_slug(slug, except_id)
            .await
            .context("Failed to check category slug")?
        {
            return Err(CategoryServiceError::DuplicateSlug(FormErrors::single(
                "slug",
                "Category with this slug already exists.",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::setup_pool;
    use crate::db::repositories::SqlxCategoryRepository;

    fn form(title: &str, slug: &str) -> CategoryForm {
        CategoryForm {
            title: Some(title.to_string()),
            slug: Some(slug.to_string()),
            ..Default::default()
        }
    }

    async fn setup_test_service() -> CategoryService {
        CategoryService::new(SqlxCategoryRepository::boxed(setup_pool().await))
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let service = setup_test_service().await;

        let created = service.create(form("Travel", "travel")).await.unwrap();
        assert!(created.is_published);

        let all = service.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].slug, "travel");
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let service = setup_test_service().await;
        service.create(form("Travel", "travel")).await.unwrap();

        assert!(matches!(
            service.create(form("Trips", "travel")).await,
            Err(CategoryServiceError::DuplicateSlug(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_own_slug() {
        let service = setup_test_service().await;
        let created = service.create(form("Travel", "travel")).await.unwrap();
        service.create(form("Food", "food")).await.unwrap();

        let renamed = service
            .update(created.id, form("Journeys", "travel"))
            .await
            .unwrap();
        assert_eq!(renamed.title, "Journeys");

        assert!(matches!(
            service.update(created.id, form("Journeys", "food")).await,
            Err(CategoryServiceError::DuplicateSlug(_))
        ));
        assert!(matches!(
            service.update(999, form("Ghost", "ghost")).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_category() {
        let service = setup_test_service().await;
        let created = service.create(form("Travel", "travel")).await.unwrap();

        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.delete(created.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }
}
