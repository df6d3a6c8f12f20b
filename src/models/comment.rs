//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity. Any registered user may comment, authorship is not
/// required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier
    pub id: i64,
    /// Post the comment belongs to
    pub post_id: i64,
    /// Commenting user ID
    pub user_id: i64,
    /// Comment body
    pub body: String,
    /// Aggregated rating, may be negative
    pub rating: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create a new comment with the given parameters
    pub fn new(post_id: i64, user_id: i64, body: String) -> Self {
        Self {
            id: 0, // Will be set by database
            post_id,
            user_id,
            body,
            rating: 0,
            created_at: Utc::now(),
        }
    }
}

/// Comment joined with commenter info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    /// Unique identifier
    pub id: i64,
    /// Post the comment belongs to
    pub post_id: i64,
    /// Commenting user ID
    pub user_id: i64,
    /// Username of the commenting user
    pub username: String,
    /// Comment body
    pub body: String,
    /// Aggregated rating
    pub rating: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    /// Post to comment on
    pub post_id: i64,
    /// Comment body
    pub body: String,
}
