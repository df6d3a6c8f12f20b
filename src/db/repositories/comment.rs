//! Comment repository
//!
//! Database operations for comments.
//!
//! This module provides:
//! - `CommentRepository` trait defining the interface for comment data access
//! - `SqlxCommentRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// List comments on a post with author usernames, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;

    /// Apply a rating delta and return the persisted rating.
    ///
    /// Returns `None` when the comment does not exist. The update and the
    /// re-read run inside a single transaction.
    async fn adjust_rating(&self, id: i64, delta: i64) -> Result<Option<i64>>;
}

/// SQLx-based comment repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_comment_sqlite(self.pool.as_sqlite().unwrap(), comment).await
            }
            DatabaseDriver::Mysql => {
                create_comment_mysql(self.pool.as_mysql().unwrap(), comment).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_comment_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_comment_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => {
                list_by_post_mysql(self.pool.as_mysql().unwrap(), post_id).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_comment_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_comment_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn adjust_rating(&self, id: i64, delta: i64) -> Result<Option<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                adjust_rating_sqlite(self.pool.as_sqlite().unwrap(), id, delta).await
            }
            DatabaseDriver::Mysql => {
                adjust_rating_mysql(self.pool.as_mysql().unwrap(), id, delta).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_comment_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (post_id, user_id, body, rating, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.user_id)
    .bind(&comment.body)
    .bind(comment.rating)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        post_id: comment.post_id,
        user_id: comment.user_id,
        body: comment.body.clone(),
        rating: comment.rating,
        created_at: now,
    })
}

async fn get_comment_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, post_id, user_id, body, rating, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    Ok(row.map(|row| row_to_comment_sqlite(&row)))
}

async fn list_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.post_id, c.user_id, u.username, c.body, c.rating, c.created_at
        FROM comments c
        INNER JOIN users u ON c.user_id = u.id
        WHERE c.post_id = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments for post")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            id: row.get("id"),
            post_id: row.get("post_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            body: row.get("body"),
            rating: row.get("rating"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn delete_comment_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(())
}

async fn adjust_rating_sqlite(pool: &SqlitePool, id: i64, delta: i64) -> Result<Option<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query("UPDATE comments SET rating = rating + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to adjust comment rating")?;

    if result.rows_affected() == 0 {
        tx.rollback().await.context("Failed to rollback transaction")?;
        return Ok(None);
    }

    let row = sqlx::query("SELECT rating FROM comments WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read comment rating")?;

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Some(row.get("rating")))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        body: row.get("body"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_comment_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (post_id, user_id, body, rating, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.user_id)
    .bind(&comment.body)
    .bind(comment.rating)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        post_id: comment.post_id,
        user_id: comment.user_id,
        body: comment.body.clone(),
        rating: comment.rating,
        created_at: now,
    })
}

async fn get_comment_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, post_id, user_id, body, rating, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    Ok(row.map(|row| row_to_comment_mysql(&row)))
}

async fn list_by_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.post_id, c.user_id, u.username, c.body, c.rating, c.created_at
        FROM comments c
        INNER JOIN users u ON c.user_id = u.id
        WHERE c.post_id = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments for post")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            id: row.get("id"),
            post_id: row.get("post_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            body: row.get("body"),
            rating: row.get("rating"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn delete_comment_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(())
}

async fn adjust_rating_mysql(pool: &MySqlPool, id: i64, delta: i64) -> Result<Option<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query("UPDATE comments SET rating = rating + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to adjust comment rating")?;

    if result.rows_affected() == 0 {
        tx.rollback().await.context("Failed to rollback transaction")?;
        return Ok(None);
    }

    let row = sqlx::query("SELECT rating FROM comments WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read comment rating")?;

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Some(row.get("rating")))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        body: row.get("body"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCommentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCommentRepository::new(pool.clone());
        (pool, repo)
    }

    async fn seed_user(pool: &DynDatabasePool, id: i64, username: &str) {
        let now = Utc::now();
        if let Some(sqlite_pool) = pool.as_sqlite() {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(username)
            .bind(format!("{}@example.com", username))
            .bind("hash")
            .bind(now)
            .bind(now)
            .execute(sqlite_pool)
            .await
            .expect("Failed to seed user");
        }
    }

    async fn seed_post(pool: &DynDatabasePool, id: i64, user_id: i64) {
        let now = Utc::now();
        if let Some(sqlite_pool) = pool.as_sqlite() {
            sqlx::query("INSERT OR IGNORE INTO authors (id, user_id, rating) VALUES (?, ?, 0)")
                .bind(user_id)
                .bind(user_id)
                .execute(sqlite_pool)
                .await
                .expect("Failed to seed author");
            sqlx::query(
                r#"
                INSERT INTO posts (id, author_id, post_type, title, body, rating, created_at)
                VALUES (?, ?, 'news', 'Title', 'Body', 0, ?)
                "#,
            )
            .bind(id)
            .bind(user_id)
            .bind(now)
            .execute(sqlite_pool)
            .await
            .expect("Failed to seed post");
        }
    }

    #[tokio::test]
    async fn test_create_comment() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice").await;
        seed_post(&pool, 1, 1).await;

        let created = repo
            .create(&Comment::new(1, 1, "First!".to_string()))
            .await
            .expect("Failed to create comment");

        assert!(created.id > 0);
        assert_eq!(created.post_id, 1);
        assert_eq!(created.user_id, 1);
        assert_eq!(created.body, "First!");
        assert_eq!(created.rating, 0);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo.get_by_id(999).await.expect("Failed to get comment");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_list_by_post_oldest_first() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice").await;
        seed_user(&pool, 2, "bob").await;
        seed_post(&pool, 1, 1).await;
        seed_post(&pool, 2, 1).await;

        repo.create(&Comment::new(1, 1, "first".to_string()))
            .await
            .expect("Failed to create comment");
        repo.create(&Comment::new(1, 2, "second".to_string()))
            .await
            .expect("Failed to create comment");
        repo.create(&Comment::new(2, 2, "other post".to_string()))
            .await
            .expect("Failed to create comment");

        let comments = repo.list_by_post(1).await.expect("Failed to list comments");

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].body, "first");
        assert_eq!(comments[0].username, "alice");
        assert_eq!(comments[1].body, "second");
        assert_eq!(comments[1].username, "bob");
    }

    #[tokio::test]
    async fn test_list_by_post_empty() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice").await;
        seed_post(&pool, 1, 1).await;

        let comments = repo.list_by_post(1).await.expect("Failed to list comments");

        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn test_delete_comment() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice").await;
        seed_post(&pool, 1, 1).await;

        let created = repo
            .create(&Comment::new(1, 1, "gone soon".to_string()))
            .await
            .expect("Failed to create comment");

        repo.delete(created.id).await.expect("Failed to delete");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get comment");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_adjust_rating_up_and_down() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice").await;
        seed_post(&pool, 1, 1).await;

        let created = repo
            .create(&Comment::new(1, 1, "rated".to_string()))
            .await
            .expect("Failed to create comment");

        let up = repo
            .adjust_rating(created.id, 1)
            .await
            .expect("Failed to adjust rating");
        assert_eq!(up, Some(1));

        let down = repo
            .adjust_rating(created.id, -1)
            .await
            .expect("Failed to adjust rating");
        assert_eq!(down, Some(0));
    }

    #[tokio::test]
    async fn test_adjust_rating_goes_negative() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice").await;
        seed_post(&pool, 1, 1).await;

        let created = repo
            .create(&Comment::new(1, 1, "unpopular".to_string()))
            .await
            .expect("Failed to create comment");

        repo.adjust_rating(created.id, -1)
            .await
            .expect("Failed to adjust rating");
        let rating = repo
            .adjust_rating(created.id, -1)
            .await
            .expect("Failed to adjust rating");

        assert_eq!(rating, Some(-2));
    }

    #[tokio::test]
    async fn test_adjust_rating_missing_comment() {
        let (_pool, repo) = setup_test_repo().await;

        let rating = repo
            .adjust_rating(999, 1)
            .await
            .expect("Failed to adjust rating");

        assert_eq!(rating, None);
    }
}
