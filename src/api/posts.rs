//! Post rating endpoints and shared post request types
//!
//! Handles HTTP requests common to both post kinds:
//! - POST /api/v1/posts/:id/like - Upvote a post
//! - POST /api/v1/posts/:id/dislike - Downvote a post

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::RatingResponse;

/// Request body for creating a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

/// Request body for updating a post
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category_ids: Option<Vec<i64>>,
}

/// POST /api/v1/posts/:id/like - Upvote a post
pub async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    let rating = state.post_service.like(id).await?;
    Ok(Json(RatingResponse { id, rating }))
}

/// POST /api/v1/posts/:id/dislike - Downvote a post
pub async fn dislike_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    let rating = state.post_service.dislike(id).await?;
    Ok(Json(RatingResponse { id, rating }))
}
