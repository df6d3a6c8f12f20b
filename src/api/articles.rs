//! Article API endpoints
//!
//! Handles HTTP requests for articles:
//! - GET /api/v1/articles - Full article list
//! - GET /api/v1/articles/search - Filtered article search
//! - GET /api/v1/articles/:id - Article detail
//! - POST /api/v1/articles - Create article (authors only)
//! - PUT /api/v1/articles/:id - Update article (authors only)
//! - DELETE /api/v1/articles/:id - Delete article (authors only)
//!
//! Creating or re-categorizing an article enqueues subscriber
//! notifications; that happens in the service layer.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::common::SearchQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::posts::{CreatePostRequest, UpdatePostRequest};
use crate::api::responses::{PaginatedPostsResponse, PostResponse};
use crate::models::{CreatePostInput, ListParams, PostType, UpdatePostInput};

/// Response for the unpaginated article list
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticlesResponse {
    pub articles: Vec<PostResponse>,
}

/// GET /api/v1/articles - All articles, newest first
pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let articles = state.post_service.list_articles().await?;
    Ok(Json(ArticlesResponse {
        articles: articles.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/v1/articles/search - Filtered article search
pub async fn search_articles(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let result = state
        .post_service
        .search_articles(&query.filters(), &params)
        .await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/articles/:id - Article detail
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get(PostType::Article, id).await?;
    Ok(Json(post.into()))
}

/// POST /api/v1/articles - Create an article
pub async fn create_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreatePostInput {
        post_type: PostType::Article,
        title: body.title,
        body: body.body,
        category_ids: body.category_ids,
    };
    let post = state.post_service.create(user.0.id, input).await?;
    let post = state.post_service.get(PostType::Article, post.id).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// PUT /api/v1/articles/:id - Update an article
pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let input = UpdatePostInput {
        title: body.title,
        body: body.body,
        category_ids: body.category_ids,
    };
    state
        .post_service
        .update(PostType::Article, id, input)
        .await?;
    let post = state.post_service.get(PostType::Article, id).await?;
    Ok(Json(post.into()))
}

/// DELETE /api/v1/articles/:id - Delete an article
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(PostType::Article, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
