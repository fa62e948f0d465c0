//! Fixtures shared by the repository and service tests

use chrono::{DateTime, Utc};

use super::{
    CategoryRepository, LocationRepository, PostRepository, SqlxCategoryRepository,
    SqlxLocationRepository, SqlxPostRepository, SqlxUserRepository, UserRepository,
};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::{Category, CategoryInput, Location, LocationInput, Post, PostInput, User, UserRole};

/// In-memory SQLite pool with every migration applied
pub async fn setup_pool() -> DynDatabasePool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub async fn insert_user(pool: &DynDatabasePool, username: &str) -> User {
    SqlxUserRepository::new(pool.clone())
        .create(&User::new(
            username.to_string(),
            format!("{}@example.com", username),
            "hash".to_string(),
            UserRole::Author,
        ))
        .await
        .expect("Failed to create user")
}

pub async fn insert_category(pool: &DynDatabasePool, slug: &str, is_published: bool) -> Category {
    SqlxCategoryRepository::new(pool.clone())
        .create(&CategoryInput::new(slug.to_uppercase(), slug).with_published(is_published))
        .await
        .expect("Failed to create category")
}

pub async fn insert_location(pool: &DynDatabasePool, name: &str) -> Location {
    SqlxLocationRepository::new(pool.clone())
        .create(&LocationInput::new(name))
        .await
        .expect("Failed to create location")
}

pub async fn insert_post(
    pool: &DynDatabasePool,
    author: &User,
    title: &str,
    pub_date: DateTime<Utc>,
) -> Post {
    insert_post_with(pool, author, PostInput::new(title, "Body", pub_date)).await
}

pub async fn insert_post_with(pool: &DynDatabasePool, author: &User, input: PostInput) -> Post {
    SqlxPostRepository::new(pool.clone())
        .create(author.id, &input)
        .await
        .expect("Failed to create post")
}
