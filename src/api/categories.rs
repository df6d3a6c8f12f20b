//! Category API endpoints
//!
//! Handles HTTP requests for categories and subscriptions:
//! - GET /api/v1/categories - Category list
//! - GET /api/v1/categories/:id - Category detail with posts
//! - POST /api/v1/categories/:id/subscribe - Subscribe (auth)
//! - POST /api/v1/categories/:id/unsubscribe - Unsubscribe (auth)

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PostResponse;
use crate::models::Category;

/// Response for a single category
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            created_at: category.created_at.to_rfc3339(),
        }
    }
}

/// Response for the category list
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryResponse>,
}

/// Response for category detail: the category, its posts and whether the
/// requesting user is subscribed (always false for anonymous requests)
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryDetailResponse {
    pub id: i64,
    pub name: String,
    pub post_count: i64,
    pub subscribed: bool,
    pub posts: Vec<PostResponse>,
}

/// Response for subscribe/unsubscribe operations
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub category_id: i64,
    pub subscribed: bool,
    /// Whether this call changed anything (false on duplicate subscribe
    /// or absent unsubscribe)
    pub changed: bool,
}

/// GET /api/v1/categories - Category list
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let categories = state.category_service.list().await?;
    Ok(Json(CategoryListResponse {
        categories: categories.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/v1/categories/:id - Category detail with posts
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: Option<Extension<AuthenticatedUser>>,
) -> Result<Json<CategoryDetailResponse>, ApiError> {
    let with_posts = state.category_service.get_with_post_count(id).await?;
    let posts = state.post_service.list_by_category(id).await?;

    let subscribed = match &user {
        Some(Extension(user)) => state.category_service.is_subscribed(user.0.id, id).await?,
        None => false,
    };

    Ok(Json(CategoryDetailResponse {
        id: with_posts.category.id,
        name: with_posts.category.name,
        post_count: with_posts.post_count,
        subscribed,
        posts: posts.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/v1/categories/:id/subscribe - Subscribe to a category
pub async fn subscribe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: AuthenticatedUser,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let created = state.category_service.subscribe(user.0.id, id).await?;
    Ok(Json(SubscriptionResponse {
        category_id: id,
        subscribed: true,
        changed: created,
    }))
}

/// POST /api/v1/categories/:id/unsubscribe - Unsubscribe from a category
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: AuthenticatedUser,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let removed = state.category_service.unsubscribe(user.0.id, id).await?;
    Ok(Json(SubscriptionResponse {
        category_id: id,
        subscribed: false,
        changed: removed,
    }))
}
