//! Group repository
//!
//! Database operations for groups and group memberships.
//!
//! This module provides:
//! - `GroupRepository` trait defining the interface for group data access
//! - `SqlxGroupRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Group;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Group repository trait
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Create the group if missing and return it. Idempotent.
    async fn ensure(&self, name: &str) -> Result<Group>;

    /// Get group by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Group>>;

    /// Add a user to a group. Re-adding is a no-op.
    async fn add_user(&self, user_id: i64, group_id: i64) -> Result<()>;

    /// Remove a user from a group
    async fn remove_user(&self, user_id: i64, group_id: i64) -> Result<()>;

    /// Check whether a user belongs to the named group
    async fn is_member(&self, user_id: i64, group_name: &str) -> Result<bool>;
}

/// SQLx-based group repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxGroupRepository {
    pool: DynDatabasePool,
}

impl SqlxGroupRepository {
    /// Create a new SQLx group repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GroupRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl GroupRepository for SqlxGroupRepository {
    async fn ensure(&self, name: &str) -> Result<Group> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => ensure_group_sqlite(self.pool.as_sqlite().unwrap(), name).await,
            DatabaseDriver::Mysql => ensure_group_mysql(self.pool.as_mysql().unwrap(), name).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Group>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_group_by_name_sqlite(self.pool.as_sqlite().unwrap(), name).await
            }
            DatabaseDriver::Mysql => {
                get_group_by_name_mysql(self.pool.as_mysql().unwrap(), name).await
            }
        }
    }

    async fn add_user(&self, user_id: i64, group_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_user_sqlite(self.pool.as_sqlite().unwrap(), user_id, group_id).await
            }
            DatabaseDriver::Mysql => {
                add_user_mysql(self.pool.as_mysql().unwrap(), user_id, group_id).await
            }
        }
    }

    async fn remove_user(&self, user_id: i64, group_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                remove_user_sqlite(self.pool.as_sqlite().unwrap(), user_id, group_id).await
            }
            DatabaseDriver::Mysql => {
                remove_user_mysql(self.pool.as_mysql().unwrap(), user_id, group_id).await
            }
        }
    }

    async fn is_member(&self, user_id: i64, group_name: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                is_member_sqlite(self.pool.as_sqlite().unwrap(), user_id, group_name).await
            }
            DatabaseDriver::Mysql => {
                is_member_mysql(self.pool.as_mysql().unwrap(), user_id, group_name).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn ensure_group_sqlite(pool: &SqlitePool, name: &str) -> Result<Group> {
    sqlx::query("INSERT OR IGNORE INTO groups (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to ensure group")?;

    get_group_by_name_sqlite(pool, name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Group not found after ensure"))
}

async fn get_group_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Group>> {
    let row = sqlx::query("SELECT id, name FROM groups WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get group by name")?;

    Ok(row.map(|row| Group {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

async fn add_user_sqlite(pool: &SqlitePool, user_id: i64, group_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(group_id)
        .execute(pool)
        .await
        .context("Failed to add user to group")?;

    Ok(())
}

async fn remove_user_sqlite(pool: &SqlitePool, user_id: i64, group_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM user_groups WHERE user_id = ? AND group_id = ?")
        .bind(user_id)
        .bind(group_id)
        .execute(pool)
        .await
        .context("Failed to remove user from group")?;

    Ok(())
}

async fn is_member_sqlite(pool: &SqlitePool, user_id: i64, group_name: &str) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) as count
        FROM user_groups ug
        INNER JOIN groups g ON ug.group_id = g.id
        WHERE ug.user_id = ? AND g.name = ?
        "#,
    )
    .bind(user_id)
    .bind(group_name)
    .fetch_one(pool)
    .await
    .context("Failed to check group membership")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn ensure_group_mysql(pool: &MySqlPool, name: &str) -> Result<Group> {
    sqlx::query("INSERT IGNORE INTO groups (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to ensure group")?;

    get_group_by_name_mysql(pool, name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Group not found after ensure"))
}

async fn get_group_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Group>> {
    let row = sqlx::query("SELECT id, name FROM groups WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get group by name")?;

    Ok(row.map(|row| Group {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

async fn add_user_mysql(pool: &MySqlPool, user_id: i64, group_id: i64) -> Result<()> {
    sqlx::query("INSERT IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(group_id)
        .execute(pool)
        .await
        .context("Failed to add user to group")?;

    Ok(())
}

async fn remove_user_mysql(pool: &MySqlPool, user_id: i64, group_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM user_groups WHERE user_id = ? AND group_id = ?")
        .bind(user_id)
        .bind(group_id)
        .execute(pool)
        .await
        .context("Failed to remove user from group")?;

    Ok(())
}

async fn is_member_mysql(pool: &MySqlPool, user_id: i64, group_name: &str) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) as count
        FROM user_groups ug
        INNER JOIN groups g ON ug.group_id = g.id
        WHERE ug.user_id = ? AND g.name = ?
        "#,
    )
    .bind(user_id)
    .bind(group_name)
    .fetch_one(pool)
    .await
    .context("Failed to check group membership")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}
