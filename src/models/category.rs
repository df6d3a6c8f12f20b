//! Category model
//!
//! This module defines the Category entity used to group posts and to
//! route article notifications to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity. Categories are a flat set with unique names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Category name (unique)
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new Category with the given name.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(name: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            name,
            created_at: Utc::now(),
        }
    }
}

/// Category with the posts attached to it, for detail views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithPosts {
    /// The category itself
    #[serde(flatten)]
    pub category: Category,
    /// Number of posts attached to the category
    pub post_count: i64,
}

/// Input for creating a new category
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    /// Category name
    pub name: String,
}
