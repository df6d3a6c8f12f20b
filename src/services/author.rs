//! Author service
//!
//! Promotion of users to authors and the author rating aggregate. The
//! rating counts owned posts triple, plus the author's own comments, plus
//! comments left on the author's posts.

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::{AuthorRepository, GroupRepository};
use crate::models::{Author, AUTHORS_GROUP};

/// Author service errors
#[derive(Debug, thiserror::Error)]
pub enum AuthorServiceError {
    /// Author not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error (database)
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Service for author promotion and ratings
pub struct AuthorService {
    author_repo: Arc<dyn AuthorRepository>,
    group_repo: Arc<dyn GroupRepository>,
}

impl AuthorService {
    /// Create a new author service
    pub fn new(author_repo: Arc<dyn AuthorRepository>, group_repo: Arc<dyn GroupRepository>) -> Self {
        Self {
            author_repo,
            group_repo,
        }
    }

    /// Promote a user to author.
    ///
    /// Adds the user to the `authors` group and creates the author row.
    /// Idempotent; calling it for an existing author is a no-op.
    pub async fn become_author(&self, user_id: i64) -> Result<Author, AuthorServiceError> {
        let authors = self
            .group_repo
            .ensure(AUTHORS_GROUP)
            .await
            .context("Failed to resolve authors group")?;
        self.group_repo
            .add_user(user_id, authors.id)
            .await
            .context("Failed to add user to authors group")?;

        let author = self
            .author_repo
            .get_or_create(user_id)
            .await
            .context("Failed to create author")?;
        Ok(author)
    }

    /// Check whether a user is in the `authors` group
    pub async fn is_author(&self, user_id: i64) -> Result<bool, AuthorServiceError> {
        let member = self
            .group_repo
            .is_member(user_id, AUTHORS_GROUP)
            .await
            .context("Failed to check authors group membership")?;
        Ok(member)
    }

    /// Look up the author row for a user, if any
    pub async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Author>, AuthorServiceError> {
        let author = self
            .author_repo
            .get_by_user_id(user_id)
            .await
            .context("Failed to load author")?;
        Ok(author)
    }

    /// Recompute and persist an author's rating.
    ///
    /// rating = 3 * sum(post ratings) + sum(own comment ratings)
    ///        + sum(ratings of comments on the author's posts),
    /// with absent aggregates counting as zero. Returns the new rating.
    pub async fn update_rating(&self, author_id: i64) -> Result<i64, AuthorServiceError> {
        let rating = self
            .author_repo
            .compute_rating(author_id)
            .await
            .context("Failed to compute author rating")?
            .ok_or_else(|| {
                AuthorServiceError::NotFound(format!("Author {} not found", author_id))
            })?;

        self.author_repo
            .set_rating(author_id, rating)
            .await
            .context("Failed to persist author rating")?;

        Ok(rating)
    }
}
