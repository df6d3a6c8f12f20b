//! Post repository
//!
//! Database operations for posts, their category links and ratings.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! List and search queries return posts joined with the author's username,
//! newest first. Rating adjustments run a relative update and reread inside
//! one transaction so the returned value is the persisted one.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Post, PostSearch, PostType, PostWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post and attach it to the given categories
    async fn create(&self, post: &Post, category_ids: &[i64]) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by ID joined with author username and category ids
    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>>;

    /// Update a post's title and body
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;

    /// List posts of one type, newest first, paginated. Returns the page
    /// and the total count of posts of that type.
    async fn list(&self, post_type: PostType, params: &ListParams)
        -> Result<(Vec<PostWithAuthor>, i64)>;

    /// List all posts of one type, newest first, without pagination
    async fn list_all(&self, post_type: PostType) -> Result<Vec<PostWithAuthor>>;

    /// Search posts of one type with the given filters, newest first,
    /// paginated. All present filters are ANDed.
    async fn search(
        &self,
        post_type: PostType,
        search: &PostSearch,
        params: &ListParams,
    ) -> Result<(Vec<PostWithAuthor>, i64)>;

    /// List posts attached to a category, newest first
    async fn list_by_category(&self, category_id: i64) -> Result<Vec<PostWithAuthor>>;

    /// Replace the post's category set. Returns the ids that were newly
    /// added by this call.
    async fn set_categories(&self, post_id: i64, category_ids: &[i64]) -> Result<Vec<i64>>;

    /// Get the ids of the categories a post is attached to
    async fn category_ids(&self, post_id: i64) -> Result<Vec<i64>>;

    /// Apply a relative rating change and return the new value, or None
    /// when the post does not exist.
    async fn adjust_rating(&self, id: i64, delta: i64) -> Result<Option<i64>>;

    /// List article posts created at or after the cutoff, newest first,
    /// with category ids filled in
    async fn articles_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<PostWithAuthor>>;

    /// Delete every post attached to a category. Returns the number of
    /// posts removed.
    async fn delete_by_category(&self, category_id: i64) -> Result<u64>;
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
    async fn create(&self, post: &Post, category_ids: &[i64]) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_post_sqlite(self.pool.as_sqlite().unwrap(), post, category_ids).await
            }
            DatabaseDriver::Mysql => {
                create_post_mysql(self.pool.as_mysql().unwrap(), post, category_ids).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_with_author_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_post_with_author_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(
        &self,
        post_type: PostType,
        params: &ListParams,
    ) -> Result<(Vec<PostWithAuthor>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), post_type, params).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), post_type, params).await
            }
        }
    }

    async fn list_all(&self, post_type: PostType) -> Result<Vec<PostWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_all_posts_sqlite(self.pool.as_sqlite().unwrap(), post_type).await
            }
            DatabaseDriver::Mysql => {
                list_all_posts_mysql(self.pool.as_mysql().unwrap(), post_type).await
            }
        }
    }

    async fn search(
        &self,
        post_type: PostType,
        search: &PostSearch,
        params: &ListParams,
    ) -> Result<(Vec<PostWithAuthor>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                search_posts_sqlite(self.pool.as_sqlite().unwrap(), post_type, search, params).await
            }
            DatabaseDriver::Mysql => {
                search_posts_mysql(self.pool.as_mysql().unwrap(), post_type, search, params).await
            }
        }
    }

    async fn list_by_category(&self, category_id: i64) -> Result<Vec<PostWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_category_sqlite(self.pool.as_sqlite().unwrap(), category_id).await
            }
            DatabaseDriver::Mysql => {
                list_by_category_mysql(self.pool.as_mysql().unwrap(), category_id).await
            }
        }
    }

    async fn set_categories(&self, post_id: i64, category_ids: &[i64]) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_categories_sqlite(self.pool.as_sqlite().unwrap(), post_id, category_ids).await
            }
            DatabaseDriver::Mysql => {
                set_categories_mysql(self.pool.as_mysql().unwrap(), post_id, category_ids).await
            }
        }
    }

    async fn category_ids(&self, post_id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                category_ids_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => {
                category_ids_mysql(self.pool.as_mysql().unwrap(), post_id).await
            }
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

    async fn articles_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<PostWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                articles_since_sqlite(self.pool.as_sqlite().unwrap(), cutoff).await
            }
            DatabaseDriver::Mysql => {
                articles_since_mysql(self.pool.as_mysql().unwrap(), cutoff).await
            }
        }
    }

    async fn delete_by_category(&self, category_id: i64) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_by_category_sqlite(self.pool.as_sqlite().unwrap(), category_id).await
            }
            DatabaseDriver::Mysql => {
                delete_by_category_mysql(self.pool.as_mysql().unwrap(), category_id).await
            }
        }
    }
}

const POST_WITH_AUTHOR_SELECT: &str = r#"
    SELECT p.id, p.author_id, u.username AS author_username,
           p.post_type, p.title, p.body, p.rating, p.created_at
    FROM posts p
    INNER JOIN authors a ON p.author_id = a.id
    INNER JOIN users u ON a.user_id = u.id
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post, category_ids: &[i64]) -> Result<Post> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO posts (author_id, post_type, title, body, rating, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(post.author_id)
    .bind(post.post_type.as_str())
    .bind(&post.title)
    .bind(&post.body)
    .bind(post.rating)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_rowid();

    for category_id in category_ids {
        sqlx::query("INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)")
            .bind(id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach post to category")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Post {
        id,
        author_id: post.author_id,
        post_type: post.post_type,
        title: post.title.clone(),
        body: post.body.clone(),
        rating: post.rating,
        created_at: now,
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(
        r#"
        SELECT id, author_id, post_type, title, body, rating, created_at
        FROM posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_post_with_author_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<PostWithAuthor>> {
    let sql = format!("{} WHERE p.id = ?", POST_WITH_AUTHOR_SELECT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post with author")?;

    match row {
        Some(row) => {
            let mut post = row_to_post_with_author_sqlite(&row)?;
            post.category_ids = category_ids_sqlite(pool, post.id).await?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

async fn update_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    sqlx::query("UPDATE posts SET title = ?, body = ? WHERE id = ?")
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

    get_post_by_id_sqlite(pool, post.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    post_type: PostType,
    params: &ListParams,
) -> Result<(Vec<PostWithAuthor>, i64)> {
    let sql = format!(
        "{} WHERE p.post_type = ? ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_WITH_AUTHOR_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(post_type.as_str())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_sqlite(row)?);
    }
    fill_category_ids_sqlite(pool, &mut posts).await?;

    let count_row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE post_type = ?")
        .bind(post_type.as_str())
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok((posts, count_row.get("count")))
}

async fn list_all_posts_sqlite(pool: &SqlitePool, post_type: PostType) -> Result<Vec<PostWithAuthor>> {
    let sql = format!(
        "{} WHERE p.post_type = ? ORDER BY p.created_at DESC, p.id DESC",
        POST_WITH_AUTHOR_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(post_type.as_str())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_sqlite(row)?);
    }
    fill_category_ids_sqlite(pool, &mut posts).await?;

    Ok(posts)
}

fn search_where_clause(search: &PostSearch) -> String {
    let mut clause = String::from(" WHERE p.post_type = ?");
    if search.title.is_some() {
        clause.push_str(" AND LOWER(p.title) LIKE ?");
    }
    if search.author.is_some() {
        clause.push_str(" AND LOWER(u.username) LIKE ?");
    }
    if search.date_after.is_some() {
        clause.push_str(" AND p.created_at >= ?");
    }
    if search.category_id.is_some() {
        clause.push_str(" AND p.id IN (SELECT post_id FROM post_categories WHERE category_id = ?)");
    }
    clause
}

fn like_pattern(value: &str) -> String {
    format!("%{}%", value.to_lowercase())
}

fn date_after_cutoff(search: &PostSearch) -> Option<DateTime<Utc>> {
    search
        .date_after
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

async fn search_posts_sqlite(
    pool: &SqlitePool,
    post_type: PostType,
    search: &PostSearch,
    params: &ListParams,
) -> Result<(Vec<PostWithAuthor>, i64)> {
    let clause = search_where_clause(search);
    let cutoff = date_after_cutoff(search);

    let sql = format!(
        "{}{} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_WITH_AUTHOR_SELECT, clause
    );
    let mut query = sqlx::query(&sql).bind(post_type.as_str());
    if let Some(title) = &search.title {
        query = query.bind(like_pattern(title));
    }
    if let Some(author) = &search.author {
        query = query.bind(like_pattern(author));
    }
    if let Some(cutoff) = cutoff {
        query = query.bind(cutoff);
    }
    if let Some(category_id) = search.category_id {
        query = query.bind(category_id);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to search posts")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_sqlite(row)?);
    }
    fill_category_ids_sqlite(pool, &mut posts).await?;

    let count_sql = format!(
        r#"
        SELECT COUNT(*) as count
        FROM posts p
        INNER JOIN authors a ON p.author_id = a.id
        INNER JOIN users u ON a.user_id = u.id
        {}
        "#,
        clause
    );
    let mut count_query = sqlx::query(&count_sql).bind(post_type.as_str());
    if let Some(title) = &search.title {
        count_query = count_query.bind(like_pattern(title));
    }
    if let Some(author) = &search.author {
        count_query = count_query.bind(like_pattern(author));
    }
    if let Some(cutoff) = cutoff {
        count_query = count_query.bind(cutoff);
    }
    if let Some(category_id) = search.category_id {
        count_query = count_query.bind(category_id);
    }
    let count_row = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count search results")?;

    Ok((posts, count_row.get("count")))
}

async fn list_by_category_sqlite(pool: &SqlitePool, category_id: i64) -> Result<Vec<PostWithAuthor>> {
    let sql = format!(
        r#"{}
        INNER JOIN post_categories pc ON p.id = pc.post_id
        WHERE pc.category_id = ?
        ORDER BY p.created_at DESC, p.id DESC
        "#,
        POST_WITH_AUTHOR_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(category_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by category")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_sqlite(row)?);
    }
    fill_category_ids_sqlite(pool, &mut posts).await?;

    Ok(posts)
}

async fn set_categories_sqlite(
    pool: &SqlitePool,
    post_id: i64,
    category_ids: &[i64],
) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query("SELECT category_id FROM post_categories WHERE post_id = ?")
        .bind(post_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to fetch current categories")?;
    let current: Vec<i64> = rows.iter().map(|row| row.get("category_id")).collect();

    let added: Vec<i64> = category_ids
        .iter()
        .copied()
        .filter(|id| !current.contains(id))
        .collect();
    let removed: Vec<i64> = current
        .iter()
        .copied()
        .filter(|id| !category_ids.contains(id))
        .collect();

    for category_id in &removed {
        sqlx::query("DELETE FROM post_categories WHERE post_id = ? AND category_id = ?")
            .bind(post_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach post from category")?;
    }
    for category_id in &added {
        sqlx::query("INSERT INTO post_categories (post_id, category_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach post to category")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(added)
}

async fn category_ids_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT category_id FROM post_categories WHERE post_id = ? ORDER BY category_id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to get post categories")?;

    Ok(rows.iter().map(|row| row.get("category_id")).collect())
}

async fn fill_category_ids_sqlite(pool: &SqlitePool, posts: &mut [PostWithAuthor]) -> Result<()> {
    if posts.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; posts.len()].join(", ");
    let sql = format!(
        "SELECT post_id, category_id FROM post_categories WHERE post_id IN ({}) ORDER BY category_id",
        placeholders
    );
    let mut query = sqlx::query(&sql);
    for post in posts.iter() {
        query = query.bind(post.id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get post categories")?;

    let mut by_post: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in rows {
        by_post
            .entry(row.get("post_id"))
            .or_default()
            .push(row.get("category_id"));
    }
    for post in posts.iter_mut() {
        post.category_ids = by_post.remove(&post.id).unwrap_or_default();
    }

    Ok(())
}

async fn adjust_rating_sqlite(pool: &SqlitePool, id: i64, delta: i64) -> Result<Option<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query("UPDATE posts SET rating = rating + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to adjust post rating")?;

    if result.rows_affected() == 0 {
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(None);
    }

    let row = sqlx::query("SELECT rating FROM posts WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read post rating")?;

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Some(row.get("rating")))
}

async fn articles_since_sqlite(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<PostWithAuthor>> {
    let sql = format!(
        "{} WHERE p.post_type = 'article' AND p.created_at >= ? ORDER BY p.created_at DESC, p.id DESC",
        POST_WITH_AUTHOR_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(cutoff)
        .fetch_all(pool)
        .await
        .context("Failed to list recent articles")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_sqlite(row)?);
    }
    fill_category_ids_sqlite(pool, &mut posts).await?;

    Ok(posts)
}

async fn delete_by_category_sqlite(pool: &SqlitePool, category_id: i64) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM posts WHERE id IN (SELECT post_id FROM post_categories WHERE category_id = ?)",
    )
    .bind(category_id)
    .execute(pool)
    .await
    .context("Failed to delete posts by category")?;

    Ok(result.rows_affected())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let type_str: String = row.get("post_type");
    let post_type = PostType::from_str(&type_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post type in database: {}", type_str))?;

    Ok(Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        post_type,
        title: row.get("title"),
        body: row.get("body"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    })
}

fn row_to_post_with_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithAuthor> {
    let type_str: String = row.get("post_type");
    let post_type = PostType::from_str(&type_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post type in database: {}", type_str))?;

    Ok(PostWithAuthor {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        post_type,
        title: row.get("title"),
        body: row.get("body"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
        category_ids: Vec::new(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post, category_ids: &[i64]) -> Result<Post> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO posts (author_id, post_type, title, body, rating, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(post.author_id)
    .bind(post.post_type.as_str())
    .bind(&post.title)
    .bind(&post.body)
    .bind(post.rating)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_id() as i64;

    for category_id in category_ids {
        sqlx::query("INSERT IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)")
            .bind(id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach post to category")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Post {
        id,
        author_id: post.author_id,
        post_type: post.post_type,
        title: post.title.clone(),
        body: post.body.clone(),
        rating: post.rating,
        created_at: now,
    })
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(
        r#"
        SELECT id, author_id, post_type, title, body, rating, created_at
        FROM posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_post_with_author_mysql(pool: &MySqlPool, id: i64) -> Result<Option<PostWithAuthor>> {
    let sql = format!("{} WHERE p.id = ?", POST_WITH_AUTHOR_SELECT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post with author")?;

    match row {
        Some(row) => {
            let mut post = row_to_post_with_author_mysql(&row)?;
            post.category_ids = category_ids_mysql(pool, post.id).await?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

async fn update_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    sqlx::query("UPDATE posts SET title = ?, body = ? WHERE id = ?")
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

    get_post_by_id_mysql(pool, post.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    post_type: PostType,
    params: &ListParams,
) -> Result<(Vec<PostWithAuthor>, i64)> {
    let sql = format!(
        "{} WHERE p.post_type = ? ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_WITH_AUTHOR_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(post_type.as_str())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_mysql(row)?);
    }
    fill_category_ids_mysql(pool, &mut posts).await?;

    let count_row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE post_type = ?")
        .bind(post_type.as_str())
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok((posts, count_row.get("count")))
}

async fn list_all_posts_mysql(pool: &MySqlPool, post_type: PostType) -> Result<Vec<PostWithAuthor>> {
    let sql = format!(
        "{} WHERE p.post_type = ? ORDER BY p.created_at DESC, p.id DESC",
        POST_WITH_AUTHOR_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(post_type.as_str())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_mysql(row)?);
    }
    fill_category_ids_mysql(pool, &mut posts).await?;

    Ok(posts)
}

async fn search_posts_mysql(
    pool: &MySqlPool,
    post_type: PostType,
    search: &PostSearch,
    params: &ListParams,
) -> Result<(Vec<PostWithAuthor>, i64)> {
    let clause = search_where_clause(search);
    let cutoff = date_after_cutoff(search);

    let sql = format!(
        "{}{} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_WITH_AUTHOR_SELECT, clause
    );
    let mut query = sqlx::query(&sql).bind(post_type.as_str());
    if let Some(title) = &search.title {
        query = query.bind(like_pattern(title));
    }
    if let Some(author) = &search.author {
        query = query.bind(like_pattern(author));
    }
    if let Some(cutoff) = cutoff {
        query = query.bind(cutoff);
    }
    if let Some(category_id) = search.category_id {
        query = query.bind(category_id);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to search posts")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_mysql(row)?);
    }
    fill_category_ids_mysql(pool, &mut posts).await?;

    let count_sql = format!(
        r#"
        SELECT COUNT(*) as count
        FROM posts p
        INNER JOIN authors a ON p.author_id = a.id
        INNER JOIN users u ON a.user_id = u.id
        {}
        "#,
        clause
    );
    let mut count_query = sqlx::query(&count_sql).bind(post_type.as_str());
    if let Some(title) = &search.title {
        count_query = count_query.bind(like_pattern(title));
    }
    if let Some(author) = &search.author {
        count_query = count_query.bind(like_pattern(author));
    }
    if let Some(cutoff) = cutoff {
        count_query = count_query.bind(cutoff);
    }
    if let Some(category_id) = search.category_id {
        count_query = count_query.bind(category_id);
    }
    let count_row = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count search results")?;

    Ok((posts, count_row.get("count")))
}

async fn list_by_category_mysql(pool: &MySqlPool, category_id: i64) -> Result<Vec<PostWithAuthor>> {
    let sql = format!(
        r#"{}
        INNER JOIN post_categories pc ON p.id = pc.post_id
        WHERE pc.category_id = ?
        ORDER BY p.created_at DESC, p.id DESC
        "#,
        POST_WITH_AUTHOR_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(category_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by category")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_mysql(row)?);
    }
    fill_category_ids_mysql(pool, &mut posts).await?;

    Ok(posts)
}

async fn set_categories_mysql(
    pool: &MySqlPool,
    post_id: i64,
    category_ids: &[i64],
) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query("SELECT category_id FROM post_categories WHERE post_id = ?")
        .bind(post_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to fetch current categories")?;
    let current: Vec<i64> = rows.iter().map(|row| row.get("category_id")).collect();

    let added: Vec<i64> = category_ids
        .iter()
        .copied()
        .filter(|id| !current.contains(id))
        .collect();
    let removed: Vec<i64> = current
        .iter()
        .copied()
        .filter(|id| !category_ids.contains(id))
        .collect();

    for category_id in &removed {
        sqlx::query("DELETE FROM post_categories WHERE post_id = ? AND category_id = ?")
            .bind(post_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach post from category")?;
    }
    for category_id in &added {
        sqlx::query("INSERT INTO post_categories (post_id, category_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach post to category")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(added)
}

async fn category_ids_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT category_id FROM post_categories WHERE post_id = ? ORDER BY category_id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to get post categories")?;

    Ok(rows.iter().map(|row| row.get("category_id")).collect())
}

async fn fill_category_ids_mysql(pool: &MySqlPool, posts: &mut [PostWithAuthor]) -> Result<()> {
    if posts.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; posts.len()].join(", ");
    let sql = format!(
        "SELECT post_id, category_id FROM post_categories WHERE post_id IN ({}) ORDER BY category_id",
        placeholders
    );
    let mut query = sqlx::query(&sql);
    for post in posts.iter() {
        query = query.bind(post.id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get post categories")?;

    let mut by_post: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in rows {
        by_post
            .entry(row.get("post_id"))
            .or_default()
            .push(row.get("category_id"));
    }
    for post in posts.iter_mut() {
        post.category_ids = by_post.remove(&post.id).unwrap_or_default();
    }

    Ok(())
}

async fn adjust_rating_mysql(pool: &MySqlPool, id: i64, delta: i64) -> Result<Option<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query("UPDATE posts SET rating = rating + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to adjust post rating")?;

    if result.rows_affected() == 0 {
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(None);
    }

    let row = sqlx::query("SELECT rating FROM posts WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read post rating")?;

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Some(row.get("rating")))
}

async fn articles_since_mysql(
    pool: &MySqlPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<PostWithAuthor>> {
    let sql = format!(
        "{} WHERE p.post_type = 'article' AND p.created_at >= ? ORDER BY p.created_at DESC, p.id DESC",
        POST_WITH_AUTHOR_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(cutoff)
        .fetch_all(pool)
        .await
        .context("Failed to list recent articles")?;

    let mut posts = Vec::new();
    for row in &rows {
        posts.push(row_to_post_with_author_mysql(row)?);
    }
    fill_category_ids_mysql(pool, &mut posts).await?;

    Ok(posts)
}

async fn delete_by_category_mysql(pool: &MySqlPool, category_id: i64) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM posts WHERE id IN (SELECT post_id FROM post_categories WHERE category_id = ?)",
    )
    .bind(category_id)
    .execute(pool)
    .await
    .context("Failed to delete posts by category")?;

    Ok(result.rows_affected())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let type_str: String = row.get("post_type");
    let post_type = PostType::from_str(&type_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post type in database: {}", type_str))?;

    Ok(Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        post_type,
        title: row.get("title"),
        body: row.get("body"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    })
}

fn row_to_post_with_author_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostWithAuthor> {
    let type_str: String = row.get("post_type");
    let post_type = PostType::from_str(&type_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post type in database: {}", type_str))?;

    Ok(PostWithAuthor {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        post_type,
        title: row.get("title"),
        body: row.get("body"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
        category_ids: Vec::new(),
    })
}
