//! Comment API endpoints
//!
//! Handles HTTP requests for comments:
//! - GET /api/v1/posts/:id/comments - Comments on a post
//! - POST /api/v1/comments - Create comment (auth)
//! - POST /api/v1/comments/:id/like - Upvote a comment (auth)
//! - POST /api/v1/comments/:id/dislike - Downvote a comment (auth)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::RatingResponse;
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput};

/// Response for a single comment
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub body: String,
    pub rating: i64,
    pub created_at: String,
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(comment: CommentWithAuthor) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            username: comment.username,
            body: comment.body,
            rating: comment.rating,
            created_at: comment.created_at.to_rfc3339(),
        }
    }
}

impl CommentResponse {
    fn from_comment(comment: Comment, username: String) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            username,
            body: comment.body,
            rating: comment.rating,
            created_at: comment.created_at.to_rfc3339(),
        }
    }
}

/// Response for the comment list of a post
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
}

/// GET /api/v1/posts/:id/comments - Comments on a post, oldest first
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let comments = state.comment_service.list_by_post(post_id).await?;
    Ok(Json(CommentListResponse {
        comments: comments.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/v1/comments - Create a comment
pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comment_service.create(user.0.id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::from_comment(comment, user.0.username)),
    ))
}

/// POST /api/v1/comments/:id/like - Upvote a comment
pub async fn like_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    let rating = state.comment_service.like(id).await?;
    Ok(Json(RatingResponse { id, rating }))
}

/// POST /api/v1/comments/:id/dislike - Downvote a comment
pub async fn dislike_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    let rating = state.comment_service.dislike(id).await?;
    Ok(Json(RatingResponse { id, rating }))
}
