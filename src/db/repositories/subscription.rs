//! Subscription repository
//!
//! Database operations for category subscriptions.
//!
//! This module provides:
//! - `SubscriptionRepository` trait defining the interface for subscription data access
//! - `SqlxSubscriptionRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::CategorySubscription;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Subscribe a user to a category.
    ///
    /// Returns `true` when a new subscription was created, `false` when the
    /// user was already subscribed.
    async fn subscribe(&self, user_id: i64, category_id: i64) -> Result<bool>;

    /// Unsubscribe a user from a category.
    ///
    /// Returns `true` when a subscription was removed, `false` when none
    /// existed.
    async fn unsubscribe(&self, user_id: i64, category_id: i64) -> Result<bool>;

    /// Check whether a user is subscribed to a category
    async fn is_subscribed(&self, user_id: i64, category_id: i64) -> Result<bool>;

    /// List a user's subscriptions
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<CategorySubscription>>;

    /// Distinct email addresses of users subscribed to any of the categories.
    ///
    /// Users with an empty email address are skipped.
    async fn emails_for_categories(&self, category_ids: &[i64]) -> Result<Vec<String>>;

    /// Distinct (email, category_id) pairs for users subscribed to any of
    /// the categories. Users with an empty email address are skipped.
    async fn subscribers_for_categories(&self, category_ids: &[i64]) -> Result<Vec<(String, i64)>>;
}

/// SQLx-based subscription repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSubscriptionRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriptionRepository {
    /// Create a new SQLx subscription repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriptionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn subscribe(&self, user_id: i64, category_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                subscribe_sqlite(self.pool.as_sqlite().unwrap(), user_id, category_id).await
            }
            DatabaseDriver::Mysql => {
                subscribe_mysql(self.pool.as_mysql().unwrap(), user_id, category_id).await
            }
        }
    }

    async fn unsubscribe(&self, user_id: i64, category_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                unsubscribe_sqlite(self.pool.as_sqlite().unwrap(), user_id, category_id).await
            }
            DatabaseDriver::Mysql => {
                unsubscribe_mysql(self.pool.as_mysql().unwrap(), user_id, category_id).await
            }
        }
    }

    async fn is_subscribed(&self, user_id: i64, category_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                is_subscribed_sqlite(self.pool.as_sqlite().unwrap(), user_id, category_id).await
            }
            DatabaseDriver::Mysql => {
                is_subscribed_mysql(self.pool.as_mysql().unwrap(), user_id, category_id).await
            }
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<CategorySubscription>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_user_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => list_by_user_mysql(self.pool.as_mysql().unwrap(), user_id).await,
        }
    }

    async fn emails_for_categories(&self, category_ids: &[i64]) -> Result<Vec<String>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                emails_for_categories_sqlite(self.pool.as_sqlite().unwrap(), category_ids).await
            }
            DatabaseDriver::Mysql => {
                emails_for_categories_mysql(self.pool.as_mysql().unwrap(), category_ids).await
            }
        }
    }

    async fn subscribers_for_categories(&self, category_ids: &[i64]) -> Result<Vec<(String, i64)>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                subscribers_for_categories_sqlite(self.pool.as_sqlite().unwrap(), category_ids)
                    .await
            }
            DatabaseDriver::Mysql => {
                subscribers_for_categories_mysql(self.pool.as_mysql().unwrap(), category_ids).await
            }
        }
    }
}

fn in_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

const EMAILS_QUERY: &str = r#"
    SELECT DISTINCT u.email
    FROM category_subscriptions s
    INNER JOIN users u ON s.user_id = u.id
    WHERE u.email <> '' AND s.category_id IN
"#;

const SUBSCRIBERS_QUERY: &str = r#"
    SELECT DISTINCT u.email, s.category_id
    FROM category_subscriptions s
    INNER JOIN users u ON s.user_id = u.id
    WHERE u.email <> '' AND s.category_id IN
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn subscribe_sqlite(pool: &SqlitePool, user_id: i64, category_id: i64) -> Result<bool> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO category_subscriptions (user_id, category_id, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to subscribe to category")?;

    Ok(result.rows_affected() > 0)
}

async fn unsubscribe_sqlite(pool: &SqlitePool, user_id: i64, category_id: i64) -> Result<bool> {
    let result =
        sqlx::query("DELETE FROM category_subscriptions WHERE user_id = ? AND category_id = ?")
            .bind(user_id)
            .bind(category_id)
            .execute(pool)
            .await
            .context("Failed to unsubscribe from category")?;

    Ok(result.rows_affected() > 0)
}

async fn is_subscribed_sqlite(pool: &SqlitePool, user_id: i64, category_id: i64) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) as count
        FROM category_subscriptions
        WHERE user_id = ? AND category_id = ?
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .context("Failed to check subscription")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn list_by_user_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<CategorySubscription>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, category_id, created_at
        FROM category_subscriptions
        WHERE user_id = ?
        ORDER BY category_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list subscriptions")?;

    Ok(rows
        .iter()
        .map(|row| CategorySubscription {
            id: row.get("id"),
            user_id: row.get("user_id"),
            category_id: row.get("category_id"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn emails_for_categories_sqlite(
    pool: &SqlitePool,
    category_ids: &[i64],
) -> Result<Vec<String>> {
    let sql = format!("{} ({})", EMAILS_QUERY, in_placeholders(category_ids.len()));

    let mut query = sqlx::query(&sql);
    for id in category_ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to collect subscriber emails")?;

    Ok(rows.iter().map(|row| row.get("email")).collect())
}

async fn subscribers_for_categories_sqlite(
    pool: &SqlitePool,
    category_ids: &[i64],
) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "{} ({})",
        SUBSCRIBERS_QUERY,
        in_placeholders(category_ids.len())
    );

    let mut query = sqlx::query(&sql);
    for id in category_ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to collect subscribers")?;

    Ok(rows
        .iter()
        .map(|row| (row.get("email"), row.get("category_id")))
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn subscribe_mysql(pool: &MySqlPool, user_id: i64, category_id: i64) -> Result<bool> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT IGNORE INTO category_subscriptions (user_id, category_id, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to subscribe to category")?;

    Ok(result.rows_affected() > 0)
}

async fn unsubscribe_mysql(pool: &MySqlPool, user_id: i64, category_id: i64) -> Result<bool> {
    let result =
        sqlx::query("DELETE FROM category_subscriptions WHERE user_id = ? AND category_id = ?")
            .bind(user_id)
            .bind(category_id)
            .execute(pool)
            .await
            .context("Failed to unsubscribe from category")?;

    Ok(result.rows_affected() > 0)
}

async fn is_subscribed_mysql(pool: &MySqlPool, user_id: i64, category_id: i64) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) as count
        FROM category_subscriptions
        WHERE user_id = ? AND category_id = ?
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .context("Failed to check subscription")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn list_by_user_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<CategorySubscription>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, category_id, created_at
        FROM category_subscriptions
        WHERE user_id = ?
        ORDER BY category_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list subscriptions")?;

    Ok(rows
        .iter()
        .map(|row| CategorySubscription {
            id: row.get("id"),
            user_id: row.get("user_id"),
            category_id: row.get("category_id"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn emails_for_categories_mysql(
    pool: &MySqlPool,
    category_ids: &[i64],
) -> Result<Vec<String>> {
    let sql = format!("{} ({})", EMAILS_QUERY, in_placeholders(category_ids.len()));

    let mut query = sqlx::query(&sql);
    for id in category_ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to collect subscriber emails")?;

    Ok(rows.iter().map(|row| row.get("email")).collect())
}

async fn subscribers_for_categories_mysql(
    pool: &MySqlPool,
    category_ids: &[i64],
) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "{} ({})",
        SUBSCRIBERS_QUERY,
        in_placeholders(category_ids.len())
    );

    let mut query = sqlx::query(&sql);
    for id in category_ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to collect subscribers")?;

    Ok(rows
        .iter()
        .map(|row| (row.get("email"), row.get("category_id")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxSubscriptionRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxSubscriptionRepository::new(pool.clone());
        (pool, repo)
    }

    async fn seed_user(pool: &DynDatabasePool, id: i64, username: &str, email: &str) {
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
            .bind(email)
            .bind("hash")
            .bind(now)
            .bind(now)
            .execute(sqlite_pool)
            .await
            .expect("Failed to seed user");
        }
    }

    async fn seed_category(pool: &DynDatabasePool, id: i64, name: &str) {
        let now = Utc::now();
        if let Some(sqlite_pool) = pool.as_sqlite() {
            sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?, ?, ?)")
                .bind(id)
                .bind(name)
                .bind(now)
                .execute(sqlite_pool)
                .await
                .expect("Failed to seed category");
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_is_subscribed() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice", "alice@example.com").await;
        seed_category(&pool, 1, "Politics").await;

        assert!(!repo.is_subscribed(1, 1).await.unwrap());

        let created = repo.subscribe(1, 1).await.expect("Failed to subscribe");

        assert!(created);
        assert!(repo.is_subscribed(1, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_subscribe_twice_reports_existing() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice", "alice@example.com").await;
        seed_category(&pool, 1, "Politics").await;

        assert!(repo.subscribe(1, 1).await.unwrap());
        assert!(!repo.subscribe(1, 1).await.unwrap());

        assert!(repo.is_subscribed(1, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice", "alice@example.com").await;
        seed_category(&pool, 1, "Politics").await;

        repo.subscribe(1, 1).await.expect("Failed to subscribe");

        assert!(repo.unsubscribe(1, 1).await.unwrap());
        assert!(!repo.is_subscribed(1, 1).await.unwrap());
        assert!(!repo.unsubscribe(1, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_user() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice", "alice@example.com").await;
        seed_user(&pool, 2, "bob", "bob@example.com").await;
        seed_category(&pool, 1, "Politics").await;
        seed_category(&pool, 2, "Science").await;

        repo.subscribe(1, 1).await.unwrap();
        repo.subscribe(1, 2).await.unwrap();
        repo.subscribe(2, 1).await.unwrap();

        let subs = repo.list_by_user(1).await.expect("Failed to list");

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].category_id, 1);
        assert_eq!(subs[1].category_id, 2);
    }

    #[tokio::test]
    async fn test_emails_for_categories_distinct() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice", "alice@example.com").await;
        seed_category(&pool, 1, "Politics").await;
        seed_category(&pool, 2, "Science").await;

        repo.subscribe(1, 1).await.unwrap();
        repo.subscribe(1, 2).await.unwrap();

        let emails = repo
            .emails_for_categories(&[1, 2])
            .await
            .expect("Failed to collect emails");

        assert_eq!(emails, vec!["alice@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_emails_for_categories_skips_empty_email() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice", "alice@example.com").await;
        seed_user(&pool, 2, "ghost", "").await;
        seed_category(&pool, 1, "Politics").await;

        repo.subscribe(1, 1).await.unwrap();
        repo.subscribe(2, 1).await.unwrap();

        let emails = repo
            .emails_for_categories(&[1])
            .await
            .expect("Failed to collect emails");

        assert_eq!(emails, vec!["alice@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_emails_for_categories_empty_input() {
        let (_pool, repo) = setup_test_repo().await;

        let emails = repo
            .emails_for_categories(&[])
            .await
            .expect("Failed to collect emails");

        assert!(emails.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_for_categories_pairs() {
        let (pool, repo) = setup_test_repo().await;
        seed_user(&pool, 1, "alice", "alice@example.com").await;
        seed_user(&pool, 2, "bob", "bob@example.com").await;
        seed_category(&pool, 1, "Politics").await;
        seed_category(&pool, 2, "Science").await;

        repo.subscribe(1, 1).await.unwrap();
        repo.subscribe(1, 2).await.unwrap();
        repo.subscribe(2, 2).await.unwrap();

        let mut pairs = repo
            .subscribers_for_categories(&[1, 2])
            .await
            .expect("Failed to collect subscribers");
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("alice@example.com".to_string(), 1),
                ("alice@example.com".to_string(), 2),
                ("bob@example.com".to_string(), 2),
            ]
        );
    }
}
