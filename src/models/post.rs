//! Post model
//!
//! This module provides:
//! - `Post` entity representing a news item or article
//! - `PostType` enum distinguishing the two kinds
//! - Input types for creating and updating posts
//! - Pagination and search types for list queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of characters shown in a post preview before truncation.
const PREVIEW_LEN: usize = 124;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Owning author ID
    pub author_id: i64,
    /// News or article
    pub post_type: PostType,
    /// Post title
    pub title: String,
    /// Post body
    pub body: String,
    /// Aggregated rating, may be negative
    pub rating: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post with the given parameters
    pub fn new(author_id: i64, post_type: PostType, title: String, body: String) -> Self {
        Self {
            id: 0, // Will be set by database
            author_id,
            post_type,
            title,
            body,
            rating: 0,
            created_at: Utc::now(),
        }
    }

    /// First 124 characters of the body, with "..." appended when truncated.
    ///
    /// Counts characters rather than bytes so Cyrillic text is never split
    /// mid-codepoint.
    pub fn preview(&self) -> String {
        let mut chars = self.body.chars();
        let head: String = chars.by_ref().take(PREVIEW_LEN).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// Post kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    /// Short news item, listed with pagination
    News,
    /// Long-form article, triggers subscriber notifications
    Article,
}

impl Default for PostType {
    fn default() -> Self {
        Self::News
    }
}

impl PostType {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::News => "news",
            PostType::Article => "article",
        }
    }

    /// Parse from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "news" => Some(PostType::News),
            "article" => Some(PostType::Article),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Post joined with author info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithAuthor {
    /// Unique identifier
    pub id: i64,
    /// Owning author ID
    pub author_id: i64,
    /// Username of the owning author's user
    pub author_username: String,
    /// News or article
    pub post_type: PostType,
    /// Post title
    pub title: String,
    /// Post body
    pub body: String,
    /// Aggregated rating
    pub rating: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// IDs of the categories the post belongs to
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

/// Input for creating a new post
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    /// News or article
    pub post_type: PostType,
    /// Post title
    pub title: String,
    /// Post body
    pub body: String,
    /// Categories to attach (may be empty)
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

/// Input for updating an existing post
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    /// New title (optional)
    pub title: Option<String>,
    /// New body (optional)
    pub body: Option<String>,
    /// Replacement category set (optional)
    pub category_ids: Option<Vec<i64>>,
}

impl UpdatePostInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some() || self.body.is_some() || self.category_ids.is_some()
    }
}

/// Search filters for post queries. All present filters are ANDed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostSearch {
    /// Case-insensitive title substring
    pub title: Option<String>,
    /// Case-insensitive author username substring
    pub author: Option<String>,
    /// Only posts created on or after this date
    pub date_after: Option<NaiveDate>,
    /// Only posts attached to this category
    pub category_id: Option<i64>,
}

impl PostSearch {
    /// Check if any filter is set
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.date_after.is_none()
            && self.category_id.is_none()
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        ((self.page.saturating_sub(1)) * self.per_page) as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total as u32) + self.per_page - 1) / self.per_page
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of items in the current page
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}
