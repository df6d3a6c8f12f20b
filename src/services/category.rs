//! Category service
//!
//! Categories are a small, rarely-written set, so lookups go through the
//! in-process cache. Subscription management lives here as well since
//! subscriptions hang off categories.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, SubscriptionRepository};
use crate::models::{Category, CategoryWithPosts, CreateCategoryInput};

/// Default cache TTL for categories (1 hour)
const CATEGORY_CACHE_TTL_SECS: u64 = 3600;

/// Cache key prefixes
const CACHE_KEY_CATEGORY_BY_ID: &str = "category:id:";
const CACHE_KEY_CATEGORY_LIST: &str = "category:list";

/// Category service errors
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category name already exists
    #[error("Category name already exists: {0}")]
    DuplicateName(String),

    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Input validation failed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error (database, cache)
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Service for categories and category subscriptions
pub struct CategoryService {
    category_repo: Arc<dyn CategoryRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(
        category_repo: Arc<dyn CategoryRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            category_repo,
            subscription_repo,
            cache,
            cache_ttl: Duration::from_secs(CATEGORY_CACHE_TTL_SECS),
        }
    }

    /// Create a new category.
    ///
    /// Names must be non-empty and unique.
    pub async fn create(
        &self,
        input: CreateCategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category name cannot be empty".to_string(),
            ));
        }

        if self
            .category_repo
            .get_by_name(&name)
            .await
            .context("Failed to check category name")?
            .is_some()
        {
            return Err(CategoryServiceError::DuplicateName(name));
        }

        let created = self
            .category_repo
            .create(&Category::new(name))
            .await
            .context("Failed to create category")?;

        self.invalidate_cache().await;

        Ok(created)
    }

    /// List all categories, cached
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(categories) = self
            .cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST)
            .await
            .ok()
            .flatten()
        {
            return Ok(categories);
        }

        let categories = self
            .category_repo
            .list()
            .await
            .context("Failed to list categories")?;

        let _ = self
            .cache
            .set(CACHE_KEY_CATEGORY_LIST, &categories, self.cache_ttl)
            .await;

        Ok(categories)
    }

    /// Get a category by id, cached
    pub async fn get_by_id(&self, id: i64) -> Result<Category, CategoryServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_CATEGORY_BY_ID, id);
        if let Some(category) = self.cache.get::<Category>(&cache_key).await.ok().flatten() {
            return Ok(category);
        }

        let category = self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Category {} not found", id)))?;

        let _ = self.cache.set(&cache_key, &category, self.cache_ttl).await;

        Ok(category)
    }

    /// Get a category together with its post count, for detail views
    pub async fn get_with_post_count(
        &self,
        id: i64,
    ) -> Result<CategoryWithPosts, CategoryServiceError> {
        let category = self.get_by_id(id).await?;
        let post_count = self
            .category_repo
            .post_count(id)
            .await
            .context("Failed to count posts in category")?;
        Ok(CategoryWithPosts {
            category,
            post_count,
        })
    }

    /// Delete a category.
    ///
    /// Post and subscription links go away with it.
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        // Surface NotFound before deleting
        self.get_by_id(id).await?;

        self.category_repo
            .delete(id)
            .await
            .context("Failed to delete category")?;

        self.invalidate_cache().await;

        Ok(())
    }

    /// Subscribe a user to a category.
    ///
    /// Idempotent; returns `true` when the subscription was newly created.
    pub async fn subscribe(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> Result<bool, CategoryServiceError> {
        self.get_by_id(category_id).await?;

        let created = self
            .subscription_repo
            .subscribe(user_id, category_id)
            .await
            .context("Failed to subscribe")?;
        Ok(created)
    }

    /// Unsubscribe a user from a category.
    ///
    /// Idempotent; returns `true` when a subscription was actually removed.
    pub async fn unsubscribe(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> Result<bool, CategoryServiceError> {
        self.get_by_id(category_id).await?;

        let removed = self
            .subscription_repo
            .unsubscribe(user_id, category_id)
            .await
            .context("Failed to unsubscribe")?;
        Ok(removed)
    }

    /// Check whether a user is subscribed to a category
    pub async fn is_subscribed(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> Result<bool, CategoryServiceError> {
        let subscribed = self
            .subscription_repo
            .is_subscribed(user_id, category_id)
            .await
            .context("Failed to check subscription")?;
        Ok(subscribed)
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern("category:*").await;
    }
}
