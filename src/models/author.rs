//! Author model

use serde::{Deserialize, Serialize};

/// Author entity, created when a user elects to become an author.
///
/// The rating is a derived aggregate over the author's posts and comments,
/// recomputed by `AuthorService::update_rating`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    /// Unique identifier
    pub id: i64,
    /// Owning user ID (unique)
    pub user_id: i64,
    /// Aggregated rating, may be negative
    pub rating: i64,
}
