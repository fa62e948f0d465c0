//! Location repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Location, LocationInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, input: &LocationInput) -> Result<Location>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// All locations ordered by name; `published_only` drops hidden ones
    async fn list(&self, published_only: bool) -> Result<Vec<Location>>;

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Location>;

    /// Delete a location, detaching its posts. Returns false when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &LocationInput) -> Result<Location> {
        let now = Utc::now();
        let sql = "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.name)
                .bind(input.is_published)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create location")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.name)
                .bind(input.is_published)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create location")?
                .last_insert_id() as i64,
        };

        Ok(Location {
            id,
            name: input.name.clone(),
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_location_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_location_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self, published_only: bool) -> Result<Vec<Location>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_locations_sqlite(self.pool.sqlite()?, published_only).await,
            DatabaseDriver::Mysql => list_locations_mysql(self.pool.mysql()?, published_only).await,
        }
    }

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Location> {
        let sql = "UPDATE locations SET name = ?, is_published = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&input.name)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update location")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&input.name)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update location")?;
            }
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Location not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_location_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_location_mysql(self.pool.mysql()?, id).await,
        }
    }
}

fn list_sql(published_only: bool) -> &'static str {
    if published_only {
        "SELECT id, name, is_published, created_at FROM locations WHERE is_published = 1 ORDER BY name, id"
    } else {
        "SELECT id, name, is_published, created_at FROM locations ORDER BY name, id"
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_location_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Location>> {
    let row = sqlx::query("SELECT id, name, is_published, created_at FROM locations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get location by ID")?;

    Ok(row.as_ref().map(row_to_location_sqlite))
}

async fn list_locations_sqlite(pool: &SqlitePool, published_only: bool) -> Result<Vec<Location>> {
    let rows = sqlx::query(list_sql(published_only))
        .fetch_all(pool)
        .await
        .context("Failed to list locations")?;

    Ok(rows.iter().map(row_to_location_sqlite).collect())
}

async fn delete_location_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE posts SET location_id = NULL WHERE location_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to detach posts from location")?;

    let result = sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete location")?;

    tx.commit().await.context("Failed to commit location delete")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_location_sqlite(row: &sqlx::sqlite::SqliteRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_location_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Location>> {
    let row = sqlx::query("SELECT id, name, is_published, created_at FROM locations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get location by ID")?;

    Ok(row.as_ref().map(row_to_location_mysql))
}

async fn list_locations_mysql(pool: &MySqlPool, published_only: bool) -> Result<Vec<Location>> {
    let rows = sqlx::query(list_sql(published_only))
        .fetch_all(pool)
        .await
        .context("Failed to list locations")?;

    Ok(rows.iter().map(row_to_location_mysql).collect())
}

async fn delete_location_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE posts SET location_id = NULL WHERE location_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to detach posts from location")?;

    let result = sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete location")?;

    tx.commit().await.context("Failed to commit location delete")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_location_mysql(row: &sqlx::mysql::MySqlRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
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
    async fn test_create_update_and_list() {
        let repo = SqlxLocationRepository::new(setup_pool().await);

        let moscow = repo.create(&LocationInput::new("Moscow")).await.unwrap();
        repo.create(&LocationInput::new("Atlantis").with_published(false))
            .await
            .unwrap();

        assert_eq!(repo.list(false).await.unwrap().len(), 2);
        let visible = repo.list(true).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Moscow");

        let renamed = repo
            .update(moscow.id, &LocationInput::new("Saint Petersburg"))
            .await
            .expect("Failed to update location");
        assert_eq!(renamed.name, "Saint Petersburg");
    }

    #[tokio::test]
    async fn test_delete_location_keeps_posts() {
        let pool = setup_pool().await;
        let repo = SqlxLocationRepository::new(pool.clone());
        let author = insert_user(&pool, "writer").await;
        let location = repo.create(&LocationInput::new("Nowhere")).await.unwrap();
        let post = insert_post_with(
            &pool,
            &author,
            PostInput::new("Trip", "Body", Utc::now()).with_location(location.id),
        )
        .await;

        assert!(repo.delete(location.id).await.unwrap());

        let reloaded = SqlxPostRepository::new(pool)
            .get_by_id(post.id)
            .await
            .unwrap()
            .expect("Post should survive location deletion");
        assert_eq!(reloaded.location_id, None);
    }
}
