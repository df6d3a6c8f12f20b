//! Comment service
//!
//! Comments belong to posts and any registered user can leave one. Votes
//! adjust the comment rating by one in either direction.

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput};

/// Comment service errors
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Input validation failed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Comment or post not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error (database)
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Service for comments on posts
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(comment_repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self {
            comment_repo,
            post_repo,
        }
    }

    /// Create a comment on a post
    pub async fn create(
        &self,
        user_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        if input.body.trim().is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment body cannot be empty".to_string(),
            ));
        }

        if self
            .post_repo
            .get_by_id(input.post_id)
            .await
            .context("Failed to check post")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound(format!(
                "Post {} not found",
                input.post_id
            )));
        }

        let comment = self
            .comment_repo
            .create(&Comment::new(input.post_id, user_id, input.body))
            .await
            .context("Failed to create comment")?;
        Ok(comment)
    }

    /// List the comments on a post, oldest first
    pub async fn list_by_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        if self
            .post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to check post")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound(format!(
                "Post {} not found",
                post_id
            )));
        }

        let comments = self
            .comment_repo
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")?;
        Ok(comments)
    }

    /// Upvote a comment, returning the new rating
    pub async fn like(&self, comment_id: i64) -> Result<i64, CommentServiceError> {
        self.adjust_rating(comment_id, 1).await
    }

    /// Downvote a comment, returning the new rating
    pub async fn dislike(&self, comment_id: i64) -> Result<i64, CommentServiceError> {
        self.adjust_rating(comment_id, -1).await
    }

    async fn adjust_rating(
        &self,
        comment_id: i64,
        delta: i64,
    ) -> Result<i64, CommentServiceError> {
        self.comment_repo
            .adjust_rating(comment_id, delta)
            .await
            .context("Failed to adjust comment rating")?
            .ok_or_else(|| {
                CommentServiceError::NotFound(format!("Comment {} not found", comment_id))
            })
    }
}
