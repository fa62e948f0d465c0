//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, CategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &CategoryInput) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by title
    async fn list(&self) -> Result<Vec<Category>>;

    /// List published categories ordered by title
    async fn list_published(&self) -> Result<Vec<Category>>;

    /// Replace a category's fields
    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category>;

    /// Delete a category, detaching its posts. Returns false when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check whether a slug is used by a category other than `except_id`
    async fn exists_by_slug(&self, slug: &str, except_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CategoryInput) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_category_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_category_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_category_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_category_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_slug_sqlite(self.pool.sqlite()?, slug).await
            }
            DatabaseDriver::Mysql => get_category_by_slug_mysql(self.pool.mysql()?, slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.sqlite()?, false).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.mysql()?, false).await,
        }
    }

    async fn list_published(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.sqlite()?, true).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.mysql()?, true).await,
        }
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_category_sqlite(self.pool.sqlite()?, id, input).await,
            DatabaseDriver::Mysql => update_category_mysql(self.pool.mysql()?, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_category_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str, except_id: Option<i64>) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_sqlite(self.pool.sqlite()?, slug, except_id).await
            }
            DatabaseDriver::Mysql => exists_by_slug_mysql(self.pool.mysql()?, slug, except_id).await,
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";

fn list_sql(published_only: bool) -> String {
    format!(
        "SELECT {} FROM categories {} ORDER BY title, id",
        CATEGORY_COLUMNS,
        if published_only { "WHERE is_published = 1" } else { "" }
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, input: &CategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category_sqlite))
}

async fn get_category_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    Ok(row.as_ref().map(row_to_category_sqlite))
}

async fn list_categories_sqlite(pool: &SqlitePool, published_only: bool) -> Result<Vec<Category>> {
    let rows = sqlx::query(&list_sql(published_only))
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn update_category_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &CategoryInput,
) -> Result<Category> {
    sqlx::query(
        r#"
        UPDATE categories
        SET title = ?, description = ?, slug = ?, is_published = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    get_category_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE posts SET category_id = NULL WHERE category_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to detach posts from category")?;

    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete category")?;

    tx.commit().await.context("Failed to commit category delete")?;
    Ok(result.rows_affected() > 0)
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str, except_id: Option<i64>) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM categories WHERE slug = ? AND (? IS NULL OR id <> ?)",
    )
    .bind(slug)
    .bind(except_id)
    .bind(except_id)
    .fetch_one(pool)
    .await
    .context("Failed to check category slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, input: &CategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category_mysql))
}

async fn get_category_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    Ok(row.as_ref().map(row_to_category_mysql))
}

async fn list_categories_mysql(pool: &MySqlPool, published_only: bool) -> Result<Vec<Category>> {
    let rows = sqlx::query(&list_sql(published_only))
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn update_category_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &CategoryInput,
) -> Result<Category> {
    sqlx::query(
        r#"
        UPDATE categories
        SET title = ?, description = ?, slug = ?, is_published = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    get_category_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE posts SET category_id = NULL WHERE category_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to detach posts from category")?;

    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete category")?;

    tx.commit().await.context("Failed to commit category delete")?;
    Ok(result.rows_affected() > 0)
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str, except_id: Option<i64>) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM categories WHERE slug = ? AND (? IS NULL OR id <> ?)",
    )
    .bind(slug)
    .bind(except_id)
    .bind(except_id)
    .fetch_one(pool)
    .await
    .context("Failed to check category slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_post_with, insert_user, setup_pool};
    use crate::db::repositories::{PostRepository, SqlxPostRepository};
    use crate::models::PostInput;

    #[tokio::test]
    async fn test_create_and_get_category() {
        let repo = SqlxCategoryRepository::new(setup_pool().await);

        let created = repo
            .create(&CategoryInput::new("Travel", "travel").with_description("Trips"))
            .await
            .expect("Failed to create category");
        assert!(created.id > 0);
        assert!(created.is_published);

        let by_slug = repo
            .get_by_slug("travel")
            .await
            .expect("Failed to get category")
            .expect("Category not found");
        assert_eq!(by_slug.id, created.id);
        assert_eq!(by_slug.description, "Trips");

        assert!(repo.get_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_published_only() {
        let repo = SqlxCategoryRepository::new(setup_pool().await);
        repo.create(&CategoryInput::new("Alpha", "alpha")).await.unwrap();
        repo.create(&CategoryInput::new("Beta", "beta").with_published(false))
            .await
            .unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 2);

        let published = repo.list_published().await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].slug, "alpha");
    }

    #[tokio::test]
    async fn test_update_category() {
        let repo = SqlxCategoryRepository::new(setup_pool().await);
        let created = repo.create(&CategoryInput::new("Old", "old")).await.unwrap();

        let updated = repo
            .update(created.id, &CategoryInput::new("New", "new").with_published(false))
            .await
            .expect("Failed to update category");

        assert_eq!(updated.title, "New");
        assert_eq!(updated.slug, "new");
        assert!(!updated.is_published);
    }

    #[tokio::test]
    async fn test_unique_slug_constraint() {
        let repo = SqlxCategoryRepository::new(setup_pool().await);
        let first = repo.create(&CategoryInput::new("One", "dup")).await.unwrap();

        assert!(repo.create(&CategoryInput::new("Two", "dup")).await.is_err());
        assert!(repo.exists_by_slug("dup", None).await.unwrap());
        assert!(!repo.exists_by_slug("dup", Some(first.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_category_keeps_posts() {
        let pool = setup_pool().await;
        let repo = SqlxCategoryRepository::new(pool.clone());
        let posts = SqlxPostRepository::new(pool.clone());

        let author = insert_user(&pool, "writer").await;
        let category = repo.create(&CategoryInput::new("Doomed", "doomed")).await.unwrap();
        let post = insert_post_with(
            &pool,
            &author,
            PostInput::new("Kept", "Body", Utc::now()).with_category(category.id),
        )
        .await;

        assert!(repo.delete(category.id).await.expect("Failed to delete category"));
        assert!(!repo.delete(category.id).await.unwrap());

        let reloaded = posts
            .get_by_id(post.id)
            .await
            .expect("Failed to get post")
            .expect("Post should survive category deletion");
        assert_eq!(reloaded.category_id, None);
        assert_eq!(reloaded.category_published, None);
    }
}
