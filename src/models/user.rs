//! User model
//!
//! This module defines the User entity and related types for the Gazette
//! publishing service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered user in the system.
///
/// Authorization is group-based: every registered user belongs to the
/// `common` group, and publishing rights come with membership in the
/// `authors` group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// Note: The password should already be hashed before calling this
    /// function. Use `services::password::hash_password()` to hash it.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            first_name: None,
            last_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Human-readable name: "First Last" when set, username otherwise
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{} {}", first, last)
            }
            (Some(first), _) if !first.is_empty() => first.clone(),
            _ => self.username.clone(),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// First name (optional)
    pub first_name: Option<String>,
    /// Last name (optional)
    pub last_name: Option<String>,
}

/// Input for updating a user's profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    /// New first name (optional)
    pub first_name: Option<String>,
    /// New last name (optional)
    pub last_name: Option<String>,
    /// New email (optional)
    pub email: Option<String>,
}

impl UpdateProfileInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.email.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "testuser".to_string(),
            "test@example.com".to_string(),
            "hashed_password".to_string(),
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.email, "test@example.com");
        assert!(user.first_name.is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = User::new("ivan".to_string(), "i@e.com".to_string(), "h".to_string());
        assert_eq!(user.display_name(), "ivan");

        user.first_name = Some("Ivan".to_string());
        assert_eq!(user.display_name(), "Ivan");

        user.last_name = Some("Petrov".to_string());
        assert_eq!(user.display_name(), "Ivan Petrov");
    }

    #[test]
    fn test_update_profile_has_changes() {
        assert!(!UpdateProfileInput::default().has_changes());
        let input = UpdateProfileInput {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };
        assert!(input.has_changes());
    }
}
