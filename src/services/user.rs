//! User service
//!
//! Handles registration, login, session management and profile updates.
//! Passwords are stored as Argon2id hashes; sessions are opaque UUID tokens
//! with a fixed expiry. Every new user joins the `common` group.

use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::repositories::{GroupRepository, SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, UpdateProfileInput, User, COMMON_GROUP};
use crate::services::password::{hash_password, verify_password};

/// Session lifetime
pub const SESSION_DURATION_DAYS: i64 = 7;

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Input validation failed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username or email is already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Wrong credentials or invalid session
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// User not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error (database, hashing)
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Service for user accounts and sessions
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    group_repo: Arc<dyn GroupRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        group_repo: Arc<dyn GroupRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            group_repo,
        }
    }

    /// Register a new user.
    ///
    /// Validates the input, rejects duplicate usernames and emails, hashes
    /// the password and adds the new user to the `common` group.
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let mut user = User::new(input.username, input.email, password_hash);
        user.first_name = input.first_name;
        user.last_name = input.last_name;

        let user = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        let common = self
            .group_repo
            .ensure(COMMON_GROUP)
            .await
            .context("Failed to resolve common group")?;
        self.group_repo
            .add_user(user.id, common.id)
            .await
            .context("Failed to add user to common group")?;

        Ok(user)
    }

    /// Log in with a username or email and a password.
    ///
    /// Returns the user and a fresh session on success.
    pub async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let user = match self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to look up user by username")?
        {
            Some(user) => Some(user),
            None => self
                .user_repo
                .get_by_email(username_or_email)
                .await
                .context("Failed to look up user by email")?,
        };

        let user = user.ok_or_else(|| {
            UserServiceError::AuthenticationError("Invalid username or password".to_string())
        })?;

        let valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::AuthenticationError(
                "Invalid username or password".to_string(),
            ));
        }

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Create a new session for a user
    pub async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(SESSION_DURATION_DAYS),
            created_at: now,
        };

        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(session)
    }

    /// Validate a session token and return the associated user.
    ///
    /// An expired session is deleted and treated as absent.
    pub async fn validate_session(
        &self,
        session_id: &str,
    ) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to look up session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(session_id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to load session user")?;
        Ok(user)
    }

    /// Log out by deleting the session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Get a user by id
    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to load user")?
            .ok_or_else(|| UserServiceError::NotFound(format!("User {} not found", id)))
    }

    /// Update a user's profile fields.
    ///
    /// Only the provided fields change; a new email must still be unique.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self.get_by_id(user_id).await?;

        if !input.has_changes() {
            return Ok(user);
        }

        if let Some(email) = input.email {
            if !email.contains('@') {
                return Err(UserServiceError::ValidationError(
                    "Email must contain '@'".to_string(),
                ));
            }
            if email != user.email {
                if self
                    .user_repo
                    .get_by_email(&email)
                    .await
                    .context("Failed to check email")?
                    .is_some()
                {
                    return Err(UserServiceError::UserExists(format!(
                        "Email '{}' is already registered",
                        email
                    )));
                }
                user.email = email;
            }
        }
        if let Some(first_name) = input.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = input.last_name {
            user.last_name = Some(last_name);
        }
        user.updated_at = Utc::now();

        let user = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;
        Ok(user)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let deleted = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(deleted)
    }
}

fn validate_register_input(input: &CreateUserInput) -> Result<(), UserServiceError> {
    if input.username.trim().is_empty() {
        return Err(UserServiceError::ValidationError(
            "Username cannot be empty".to_string(),
        ));
    }
    if input.email.trim().is_empty() {
        return Err(UserServiceError::ValidationError(
            "Email cannot be empty".to_string(),
        ));
    }
    if !input.email.contains('@') {
        return Err(UserServiceError::ValidationError(
            "Email must contain '@'".to_string(),
        ));
    }
    if input.password.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Password cannot be empty".to_string(),
        ));
    }
    Ok(())
}
