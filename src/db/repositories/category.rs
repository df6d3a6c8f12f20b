//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Delete a category
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count posts attached to a category
    async fn post_count(&self, id: i64) -> Result<i64>;
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
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_name_sqlite(self.pool.as_sqlite().unwrap(), name).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_name_mysql(self.pool.as_mysql().unwrap(), name).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_category_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn post_count(&self, id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => post_count_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => post_count_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO categories (name, created_at) VALUES (?, ?)")
        .bind(&category.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        name: category.name.clone(),
        created_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn get_category_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, created_at FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn post_count_sqlite(pool: &SqlitePool, id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM post_categories WHERE category_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to count posts in category")?;

    Ok(row.get("count"))
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO categories (name, created_at) VALUES (?, ?)")
        .bind(&category.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        name: category.name.clone(),
        created_at: now,
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn get_category_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, created_at FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn post_count_mysql(pool: &MySqlPool, id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM post_categories WHERE category_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to count posts in category")?;

    Ok(row.get("count"))
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_category() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&Category::new("Politics".to_string()))
            .await
            .expect("Failed to create category");

        assert!(created.id > 0);
        assert_eq!(created.name, "Politics");
    }

    #[tokio::test]
    async fn test_get_by_id_and_name() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&Category::new("Science".to_string()))
            .await
            .expect("Failed to create category");

        let by_id = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get category")
            .expect("Category not found");
        assert_eq!(by_id.name, "Science");

        let by_name = repo
            .get_by_name("Science")
            .await
            .expect("Failed to get category")
            .expect("Category not found");
        assert_eq!(by_name.id, created.id);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo.get_by_id(999).await.expect("Failed to get category");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_unique_name_constraint() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&Category::new("Sport".to_string()))
            .await
            .expect("Failed to create category");
        let result = repo.create(&Category::new("Sport".to_string())).await;

        assert!(result.is_err(), "Should fail due to duplicate name");
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&Category::new("Zoology".to_string()))
            .await
            .expect("Failed to create category");
        repo.create(&Category::new("Art".to_string()))
            .await
            .expect("Failed to create category");

        let list = repo.list().await.expect("Failed to list categories");

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Art");
        assert_eq!(list[1].name, "Zoology");
    }

    #[tokio::test]
    async fn test_delete_category() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&Category::new("Temp".to_string()))
            .await
            .expect("Failed to create category");

        repo.delete(created.id).await.expect("Failed to delete");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get category");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_post_count_empty() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&Category::new("Empty".to_string()))
            .await
            .expect("Failed to create category");

        let count = repo
            .post_count(created.id)
            .await
            .expect("Failed to count posts");
        assert_eq!(count, 0);
    }
}
