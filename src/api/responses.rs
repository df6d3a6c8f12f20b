//! Shared API response types
//!
//! Response structures used by both the news and articles endpoints.

use serde::{Deserialize, Serialize};

use crate::models::{PagedResult, PostWithAuthor};

/// Full post response used by detail and list endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub post_type: String,
    pub title: String,
    pub body: String,
    pub author_id: i64,
    pub author_username: String,
    pub rating: i64,
    pub created_at: String,
    pub category_ids: Vec<i64>,
}

impl From<PostWithAuthor> for PostResponse {
    fn from(post: PostWithAuthor) -> Self {
        Self {
            id: post.id,
            post_type: post.post_type.to_string(),
            title: post.title,
            body: post.body,
            author_id: post.author_id,
            author_username: post.author_username,
            rating: post.rating,
            created_at: post.created_at.to_rfc3339(),
            category_ids: post.category_ids,
        }
    }
}

/// Paginated post list response
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedPostsResponse {
    pub posts: Vec<PostResponse>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl From<PagedResult<PostWithAuthor>> for PaginatedPostsResponse {
    fn from(result: PagedResult<PostWithAuthor>) -> Self {
        let total = result.total;
        let page = result.page;
        let page_size = result.per_page;
        let total_pages = result.total_pages();
        Self {
            posts: result.items.into_iter().map(Into::into).collect(),
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// New rating after a like or dislike
#[derive(Debug, Serialize, Deserialize)]
pub struct RatingResponse {
    pub id: i64,
    pub rating: i64,
}
