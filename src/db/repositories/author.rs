//! Author repository
//!
//! Database operations for authors, including the rating aggregate.
//!
//! This module provides:
//! - `AuthorRepository` trait defining the interface for author data access
//! - `SqlxAuthorRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Author;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Create an author row for the user, or return the existing one.
    /// Idempotent on user_id.
    async fn get_or_create(&self, user_id: i64) -> Result<Author>;

    /// Get author by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    /// Get author by owning user ID
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Author>>;

    /// Compute the rating aggregate for the author without persisting it.
    ///
    /// The aggregate is 3 times the sum of the author's post ratings, plus
    /// the sum of the author's own comment ratings, plus the sum of ratings
    /// of comments left on the author's posts. Missing aggregates count as 0.
    async fn compute_rating(&self, id: i64) -> Result<Option<i64>>;

    /// Persist a rating value on the author row
    async fn set_rating(&self, id: i64, rating: i64) -> Result<()>;
}

/// SQLx-based author repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    /// Create a new SQLx author repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn get_or_create(&self, user_id: i64) -> Result<Author> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_or_create_author_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                get_or_create_author_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_author_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_author_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_author_by_user_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                get_author_by_user_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn compute_rating(&self, id: i64) -> Result<Option<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                compute_rating_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => compute_rating_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn set_rating(&self, id: i64, rating: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_rating_sqlite(self.pool.as_sqlite().unwrap(), id, rating).await
            }
            DatabaseDriver::Mysql => {
                set_rating_mysql(self.pool.as_mysql().unwrap(), id, rating).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_or_create_author_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Author> {
    sqlx::query("INSERT OR IGNORE INTO authors (user_id, rating) VALUES (?, 0)")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to create author")?;

    get_author_by_user_sqlite(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Author not found after create"))
}

async fn get_author_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Author>> {
    let row = sqlx::query("SELECT id, user_id, rating FROM authors WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by ID")?;

    Ok(row.map(|row| row_to_author_sqlite(&row)))
}

async fn get_author_by_user_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<Author>> {
    let row = sqlx::query("SELECT id, user_id, rating FROM authors WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by user ID")?;

    Ok(row.map(|row| row_to_author_sqlite(&row)))
}

async fn compute_rating_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<i64>> {
    let row = sqlx::query(
        r#"
        SELECT
            3 * COALESCE((SELECT SUM(p.rating) FROM posts p WHERE p.author_id = a.id), 0)
            + COALESCE((SELECT SUM(c.rating) FROM comments c WHERE c.user_id = a.user_id), 0)
            + COALESCE((SELECT SUM(c.rating) FROM comments c
                        INNER JOIN posts p ON c.post_id = p.id
                        WHERE p.author_id = a.id), 0)
            AS rating
        FROM authors a
        WHERE a.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to compute author rating")?;

    Ok(row.map(|row| row.get("rating")))
}

async fn set_rating_sqlite(pool: &SqlitePool, id: i64, rating: i64) -> Result<()> {
    sqlx::query("UPDATE authors SET rating = ? WHERE id = ?")
        .bind(rating)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set author rating")?;

    Ok(())
}

fn row_to_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> Author {
    Author {
        id: row.get("id"),
        user_id: row.get("user_id"),
        rating: row.get("rating"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_or_create_author_mysql(pool: &MySqlPool, user_id: i64) -> Result<Author> {
    sqlx::query("INSERT IGNORE INTO authors (user_id, rating) VALUES (?, 0)")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to create author")?;

    get_author_by_user_mysql(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Author not found after create"))
}

async fn get_author_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Author>> {
    let row = sqlx::query("SELECT id, user_id, rating FROM authors WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by ID")?;

    Ok(row.map(|row| row_to_author_mysql(&row)))
}

async fn get_author_by_user_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<Author>> {
    let row = sqlx::query("SELECT id, user_id, rating FROM authors WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by user ID")?;

    Ok(row.map(|row| row_to_author_mysql(&row)))
}

async fn compute_rating_mysql(pool: &MySqlPool, id: i64) -> Result<Option<i64>> {
    // SUM() is DECIMAL in MySQL, cast back to a signed integer
    let row = sqlx::query(
        r#"
        SELECT CAST(
            3 * COALESCE((SELECT SUM(p.rating) FROM posts p WHERE p.author_id = a.id), 0)
            + COALESCE((SELECT SUM(c.rating) FROM comments c WHERE c.user_id = a.user_id), 0)
            + COALESCE((SELECT SUM(c.rating) FROM comments c
                        INNER JOIN posts p ON c.post_id = p.id
                        WHERE p.author_id = a.id), 0)
            AS SIGNED) AS rating
        FROM authors a
        WHERE a.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to compute author rating")?;

    Ok(row.map(|row| row.get("rating")))
}

async fn set_rating_mysql(pool: &MySqlPool, id: i64, rating: i64) -> Result<()> {
    sqlx::query("UPDATE authors SET rating = ? WHERE id = ?")
        .bind(rating)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set author rating")?;

    Ok(())
}

fn row_to_author_mysql(row: &sqlx::mysql::MySqlRow) -> Author {
    Author {
        id: row.get("id"),
        user_id: row.get("user_id"),
        rating: row.get("rating"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxAuthorRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxAuthorRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_user(pool: &DynDatabasePool, id: i64) {
        let now = Utc::now();
        if let Some(sqlite_pool) = pool.as_sqlite() {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(format!("user{}", id))
            .bind(format!("user{}@example.com", id))
            .bind("hash")
            .bind(now)
            .bind(now)
            .execute(sqlite_pool)
            .await
            .expect("Failed to create test user");
        }
    }

    async fn insert_post(pool: &DynDatabasePool, author_id: i64, rating: i64) -> i64 {
        let sqlite_pool = pool.as_sqlite().expect("sqlite pool");
        let result = sqlx::query(
            r#"
            INSERT INTO posts (author_id, post_type, title, body, rating, created_at)
            VALUES (?, 'article', 'title', 'body', ?, ?)
            "#,
        )
        .bind(author_id)
        .bind(rating)
        .bind(Utc::now())
        .execute(sqlite_pool)
        .await
        .expect("Failed to insert post");
        result.last_insert_rowid()
    }

    async fn insert_comment(pool: &DynDatabasePool, post_id: i64, user_id: i64, rating: i64) {
        let sqlite_pool = pool.as_sqlite().expect("sqlite pool");
        sqlx::query(
            r#"
            INSERT INTO comments (post_id, user_id, body, rating, created_at)
            VALUES (?, ?, 'comment', ?, ?)
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(rating)
        .bind(Utc::now())
        .execute(sqlite_pool)
        .await
        .expect("Failed to insert comment");
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;

        let first = repo.get_or_create(1).await.expect("Failed to create author");
        let second = repo.get_or_create(1).await.expect("Failed to create author");

        assert_eq!(first.id, second.id);
        assert_eq!(first.user_id, 1);
        assert_eq!(first.rating, 0);
    }

    #[tokio::test]
    async fn test_get_by_user_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo.get_by_user_id(42).await.expect("Failed to get author");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_compute_rating_no_activity_is_zero() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;
        let author = repo.get_or_create(1).await.expect("Failed to create author");

        let rating = repo
            .compute_rating(author.id)
            .await
            .expect("Failed to compute rating")
            .expect("Author missing");

        assert_eq!(rating, 0);
    }

    #[tokio::test]
    async fn test_compute_rating_single_post() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;
        let author = repo.get_or_create(1).await.expect("Failed to create author");

        // One post rated 2 and no comments yields 3 * 2 = 6
        insert_post(&pool, author.id, 2).await;

        let rating = repo
            .compute_rating(author.id)
            .await
            .expect("Failed to compute rating")
            .expect("Author missing");

        assert_eq!(rating, 6);
    }

    #[tokio::test]
    async fn test_compute_rating_combines_all_sources() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;
        create_test_user(&pool, 2).await;
        let author = repo.get_or_create(1).await.expect("Failed to create author");
        let other = repo.get_or_create(2).await.expect("Failed to create author");

        // Author's post rated 2: contributes 6
        let own_post = insert_post(&pool, author.id, 2).await;
        // Another author's post carrying the author's own comment rated 5
        let other_post = insert_post(&pool, other.id, 0).await;
        insert_comment(&pool, other_post, 1, 5).await;
        // A stranger's comment rated 4 on the author's post
        insert_comment(&pool, own_post, 2, 4).await;

        let rating = repo
            .compute_rating(author.id)
            .await
            .expect("Failed to compute rating")
            .expect("Author missing");

        assert_eq!(rating, 6 + 5 + 4);
    }

    #[tokio::test]
    async fn test_compute_rating_can_be_negative() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;
        let author = repo.get_or_create(1).await.expect("Failed to create author");

        insert_post(&pool, author.id, -3).await;

        let rating = repo
            .compute_rating(author.id)
            .await
            .expect("Failed to compute rating")
            .expect("Author missing");

        assert_eq!(rating, -9);
    }

    #[tokio::test]
    async fn test_set_rating_persists() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;
        let author = repo.get_or_create(1).await.expect("Failed to create author");

        repo.set_rating(author.id, 42)
            .await
            .expect("Failed to set rating");

        let found = repo
            .get_by_id(author.id)
            .await
            .expect("Failed to get author")
            .expect("Author not found");
        assert_eq!(found.rating, 42);
    }
}
