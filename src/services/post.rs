//! Post service
//!
//! News items and articles share the posts table and most operations, but
//! every operation is scoped to one `PostType`: a news endpoint never
//! returns an article and vice versa. Publishing an article into
//! categories enqueues a subscriber notification job.
//!
//! Read paths run titles and bodies through the censor filter; stored
//! content is never modified.

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::{AuthorRepository, PostRepository};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostSearch, PostType, PostWithAuthor,
    UpdatePostInput,
};
use crate::notify::{NotificationJob, NotificationQueue};
use crate::services::censor::censor;

/// Post service errors
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Input validation failed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Post not found (or of the wrong type)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error (database)
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Service for news items and articles
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    author_repo: Arc<dyn AuthorRepository>,
    queue: NotificationQueue,
}

impl PostService {
    /// Create a new post service
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        author_repo: Arc<dyn AuthorRepository>,
        queue: NotificationQueue,
    ) -> Self {
        Self {
            post_repo,
            author_repo,
            queue,
        }
    }

    /// Create a post for a user.
    ///
    /// The user must already have an author row. Creating an article
    /// attached to categories enqueues a subscriber notification.
    pub async fn create(
        &self,
        user_id: i64,
        input: CreatePostInput,
    ) -> Result<Post, PostServiceError> {
        if input.title.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.body.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Body cannot be empty".to_string(),
            ));
        }

        let author = self
            .author_repo
            .get_by_user_id(user_id)
            .await
            .context("Failed to resolve author")?
            .ok_or_else(|| {
                PostServiceError::ValidationError(
                    "You must become an author before publishing".to_string(),
                )
            })?;

        let post = Post::new(author.id, input.post_type, input.title, input.body);
        let post = self
            .post_repo
            .create(&post, &input.category_ids)
            .await
            .context("Failed to create post")?;

        if post.post_type == PostType::Article && !input.category_ids.is_empty() {
            self.queue.enqueue(NotificationJob::ArticlePublished {
                post_id: post.id,
                category_ids: input.category_ids,
            });
        }

        Ok(post)
    }

    /// Get a post of one type by id, censored for display
    pub async fn get(
        &self,
        post_type: PostType,
        id: i64,
    ) -> Result<PostWithAuthor, PostServiceError> {
        let post = self
            .post_repo
            .get_with_author(id)
            .await
            .context("Failed to get post")?
            .filter(|p| p.post_type == post_type)
            .ok_or_else(|| self.not_found(post_type, id))?;
        Ok(censor_post(post))
    }

    /// Update a post's title, body and categories.
    ///
    /// Attaching an article to new categories enqueues a notification for
    /// just the newly-added ones.
    pub async fn update(
        &self,
        post_type: PostType,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        let mut post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .filter(|p| p.post_type == post_type)
            .ok_or_else(|| self.not_found(post_type, id))?;

        if !input.has_changes() {
            return Ok(post);
        }

        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
            post.title = title;
        }
        if let Some(body) = input.body {
            if body.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Body cannot be empty".to_string(),
                ));
            }
            post.body = body;
        }

        let post = self
            .post_repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        if let Some(category_ids) = input.category_ids {
            let added = self
                .post_repo
                .set_categories(id, &category_ids)
                .await
                .context("Failed to update post categories")?;
            if post.post_type == PostType::Article && !added.is_empty() {
                self.queue.enqueue(NotificationJob::ArticlePublished {
                    post_id: post.id,
                    category_ids: added,
                });
            }
        }

        Ok(post)
    }

    /// Delete a post of one type
    pub async fn delete(&self, post_type: PostType, id: i64) -> Result<(), PostServiceError> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .filter(|p| p.post_type == post_type)
            .ok_or_else(|| self.not_found(post_type, id))?;

        self.post_repo
            .delete(id)
            .await
            .context("Failed to delete post")?;
        Ok(())
    }

    /// List news, newest first, paginated
    pub async fn list_news(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithAuthor>, PostServiceError> {
        let (posts, total) = self
            .post_repo
            .list(PostType::News, params)
            .await
            .context("Failed to list news")?;
        let posts = posts.into_iter().map(censor_post).collect();
        Ok(PagedResult::new(posts, total, params))
    }

    /// List all articles, newest first
    pub async fn list_articles(&self) -> Result<Vec<PostWithAuthor>, PostServiceError> {
        let posts = self
            .post_repo
            .list_all(PostType::Article)
            .await
            .context("Failed to list articles")?;
        Ok(posts.into_iter().map(censor_post).collect())
    }

    /// Search news with the given filters, newest first, paginated
    pub async fn search_news(
        &self,
        search: &PostSearch,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithAuthor>, PostServiceError> {
        self.search(PostType::News, search, params).await
    }

    /// Search articles with the given filters, newest first, paginated
    pub async fn search_articles(
        &self,
        search: &PostSearch,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithAuthor>, PostServiceError> {
        self.search(PostType::Article, search, params).await
    }

    async fn search(
        &self,
        post_type: PostType,
        search: &PostSearch,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithAuthor>, PostServiceError> {
        let (posts, total) = self
            .post_repo
            .search(post_type, search, params)
            .await
            .context("Failed to search posts")?;
        let posts = posts.into_iter().map(censor_post).collect();
        Ok(PagedResult::new(posts, total, params))
    }

    /// List the posts attached to a category, newest first
    pub async fn list_by_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<PostWithAuthor>, PostServiceError> {
        let posts = self
            .post_repo
            .list_by_category(category_id)
            .await
            .context("Failed to list posts by category")?;
        Ok(posts.into_iter().map(censor_post).collect())
    }

    /// Upvote a post, returning the new rating
    pub async fn like(&self, id: i64) -> Result<i64, PostServiceError> {
        self.adjust_rating(id, 1).await
    }

    /// Downvote a post, returning the new rating
    pub async fn dislike(&self, id: i64) -> Result<i64, PostServiceError> {
        self.adjust_rating(id, -1).await
    }

    async fn adjust_rating(&self, id: i64, delta: i64) -> Result<i64, PostServiceError> {
        self.post_repo
            .adjust_rating(id, delta)
            .await
            .context("Failed to adjust post rating")?
            .ok_or_else(|| PostServiceError::NotFound(format!("Post {} not found", id)))
    }

    fn not_found(&self, post_type: PostType, id: i64) -> PostServiceError {
        let kind = match post_type {
            PostType::News => "News item",
            PostType::Article => "Article",
        };
        PostServiceError::NotFound(format!("{} {} not found", kind, id))
    }
}

fn censor_post(mut post: PostWithAuthor) -> PostWithAuthor {
    post.title = censor(&post.title);
    post.body = censor(&post.body);
    post
}
