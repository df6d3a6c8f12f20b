//! Category subscription model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription of a user to a category.
///
/// The (user, category) pair is unique, so re-subscribing is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySubscription {
    /// Unique identifier
    pub id: i64,
    /// Subscribing user ID
    pub user_id: i64,
    /// Subscribed category ID
    pub category_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
