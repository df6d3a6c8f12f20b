//! Group model

use serde::{Deserialize, Serialize};

/// Every registered user is placed into this group.
pub const COMMON_GROUP: &str = "common";

/// Membership gates post create/update/delete.
pub const AUTHORS_GROUP: &str = "authors";

/// Group entity for group-based authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier
    pub id: i64,
    /// Group name (unique)
    pub name: String,
}
