//! Post repository
//!
//! Database operations for posts.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Every read joins the author name, the category publish flag and the
//! comment count. Public listings filter with [`VISIBLE_POST_PREDICATE`],
//! evaluated against the `now` passed in by the caller.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Post, PostInput, PostScope};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// SQL form of the public visibility rule. Binds one parameter: the current time.
pub const VISIBLE_POST_PREDICATE: &str =
    "p.is_published = 1 AND (p.category_id IS NULL OR c.is_published = 1) AND p.pub_date <= ?";

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date, p.author_id, u.username AS author_username,
           p.location_id, p.category_id, c.is_published AS category_published,
           p.image, p.is_published, p.created_at,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post written by `author_id`
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post>;

    /// Get post by ID regardless of visibility
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Replace the editable fields of a post
    async fn update(&self, id: i64, input: &PostInput) -> Result<Post>;

    /// Delete a post together with its comments. Returns false when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count posts in a scope as of `now`
    async fn count(&self, scope: PostScope, now: DateTime<Utc>) -> Result<i64>;

    /// List posts in a scope as of `now`, newest publication date first
    async fn list(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_post_sqlite(self.pool.sqlite()?, author_id, input).await?
            }
            DatabaseDriver::Mysql => create_post_mysql(self.pool.mysql()?, author_id, input).await?,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.sqlite()?, id, input).await?,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.mysql()?, id, input).await?,
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn count(&self, scope: PostScope, now: DateTime<Utc>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_posts_sqlite(self.pool.sqlite()?, scope, now).await,
            DatabaseDriver::Mysql => count_posts_mysql(self.pool.mysql()?, scope, now).await,
        }
    }

    async fn list(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.sqlite()?, scope, now, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.mysql()?, scope, now, offset, limit).await
            }
        }
    }
}

/// WHERE clause for a scope plus the values it binds, in order
struct ScopeFilter {
    sql: String,
    owner_id: Option<i64>,
    now: Option<DateTime<Utc>>,
}

fn scope_filter(scope: PostScope, now: DateTime<Utc>) -> ScopeFilter {
    match scope {
        PostScope::Public => ScopeFilter {
            sql: format!("WHERE {}", VISIBLE_POST_PREDICATE),
            owner_id: None,
            now: Some(now),
        },
        PostScope::Category(category_id) => ScopeFilter {
            sql: format!("WHERE p.category_id = ? AND {}", VISIBLE_POST_PREDICATE),
            owner_id: Some(category_id),
            now: Some(now),
        },
        PostScope::Author {
            author_id,
            include_hidden: true,
        } => ScopeFilter {
            sql: "WHERE p.author_id = ?".to_string(),
            owner_id: Some(author_id),
            now: None,
        },
        PostScope::Author {
            author_id,
            include_hidden: false,
        } => ScopeFilter {
            sql: format!("WHERE p.author_id = ? AND {}", VISIBLE_POST_PREDICATE),
            owner_id: Some(author_id),
            now: Some(now),
        },
    }
}

fn count_sql(filter: &ScopeFilter) -> String {
    format!(
        "SELECT COUNT(*) AS count FROM posts p LEFT JOIN categories c ON c.id = p.category_id {}",
        filter.sql
    )
}

fn list_sql(filter: &ScopeFilter) -> String {
    format!(
        "{} {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_SELECT, filter.sql
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, author_id: i64, input: &PostInput) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(author_id)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(result.last_insert_rowid())
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("{} WHERE p.id = ?", POST_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    Ok(row.as_ref().map(row_to_post_sqlite))
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, input: &PostInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?, image = ?, is_published = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(())
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post comments")?;

    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?;

    tx.commit().await.context("Failed to commit post delete")?;
    Ok(result.rows_affected() > 0)
}

async fn count_posts_sqlite(pool: &SqlitePool, scope: PostScope, now: DateTime<Utc>) -> Result<i64> {
    let filter = scope_filter(scope, now);
    let sql = count_sql(&filter);

    let mut query = sqlx::query(&sql);
    if let Some(owner_id) = filter.owner_id {
        query = query.bind(owner_id);
    }
    if let Some(now) = filter.now {
        query = query.bind(now);
    }

    let row = query.fetch_one(pool).await.context("Failed to count posts")?;
    Ok(row.get("count"))
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    scope: PostScope,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let filter = scope_filter(scope, now);
    let sql = list_sql(&filter);

    let mut query = sqlx::query(&sql);
    if let Some(owner_id) = filter.owner_id {
        query = query.bind(owner_id);
    }
    if let Some(now) = filter.now {
        query = query.bind(now);
    }

    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok(rows.iter().map(row_to_post_sqlite).collect())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        category_published: row.get("category_published"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        comment_count: row.get("comment_count"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, author_id: i64, input: &PostInput) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(author_id)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(result.last_insert_id() as i64)
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("{} WHERE p.id = ?", POST_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    Ok(row.as_ref().map(row_to_post_mysql))
}

async fn update_post_mysql(pool: &MySqlPool, id: i64, input: &PostInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?, image = ?, is_published = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(())
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post comments")?;

    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?;

    tx.commit().await.context("Failed to commit post delete")?;
    Ok(result.rows_affected() > 0)
}

async fn count_posts_mysql(pool: &MySqlPool, scope: PostScope, now: DateTime<Utc>) -> Result<i64> {
    let filter = scope_filter(scope, now);
    let sql = count_sql(&filter);

    let mut query = sqlx::query(&sql);
    if let Some(owner_id) = filter.owner_id {
        query = query.bind(owner_id);
    }
    if let Some(now) = filter.now {
        query = query.bind(now);
    }

    let row = query.fetch_one(pool).await.context("Failed to count posts")?;
    Ok(row.get("count"))
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    scope: PostScope,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let filter = scope_filter(scope, now);
    let sql = list_sql(&filter);

    let mut query = sqlx::query(&sql);
    if let Some(owner_id) = filter.owner_id {
        query = query.bind(owner_id);
    }
    if let Some(now) = filter.now {
        query = query.bind(now);
    }

    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok(rows.iter().map(row_to_post_mysql).collect())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        category_published: row.get("category_published"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        comment_count: row.get("comment_count"),
    }
}
