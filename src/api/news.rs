//! News API endpoints
//!
//! Handles HTTP requests for news items:
//! - GET /api/v1/news - Paginated news list
//! - GET /api/v1/news/search - Filtered news search
//! - GET /api/v1/news/:id - News detail
//! - POST /api/v1/news - Create news (authors only)
//! - PUT /api/v1/news/:id - Update news (authors only)
//! - DELETE /api/v1/news/:id - Delete news (authors only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::common::{PaginationQuery, SearchQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::posts::{CreatePostRequest, UpdatePostRequest};
use crate::api::responses::{PaginatedPostsResponse, PostResponse};
use crate::models::{CreatePostInput, ListParams, PostType, UpdatePostInput};

/// GET /api/v1/news - Paginated news list, newest first
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let result = state.post_service.list_news(&params).await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/news/search - Filtered news search
pub async fn search_news(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let result = state
        .post_service
        .search_news(&query.filters(), &params)
        .await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/news/:id - News detail
pub async fn get_news(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get(PostType::News, id).await?;
    Ok(Json(post.into()))
}

/// POST /api/v1/news - Create a news item
pub async fn create_news(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreatePostInput {
        post_type: PostType::News,
        title: body.title,
        body: body.body,
        category_ids: body.category_ids,
    };
    let post = state.post_service.create(user.0.id, input).await?;
    let post = state.post_service.get(PostType::News, post.id).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// PUT /api/v1/news/:id - Update a news item
pub async fn update_news(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let input = UpdatePostInput {
        title: body.title,
        body: body.body,
        category_ids: body.category_ids,
    };
    state.post_service.update(PostType::News, id, input).await?;
    let post = state.post_service.get(PostType::News, id).await?;
    Ok(Json(post.into()))
}

/// DELETE /api/v1/news/:id - Delete a news item
pub async fn delete_news(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(PostType::News, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
