//! Access control helpers
//!
//! Group bootstrapping and redirect-target validation. The `common` and
//! `authors` groups are created at startup, right after migrations, so the
//! rest of the service can assume they exist.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::db::repositories::GroupRepository;
use crate::models::{AUTHORS_GROUP, COMMON_GROUP};

/// Ensure the built-in groups exist.
///
/// Idempotent; safe to call on every startup. Invoked from the server and
/// from the maintenance binaries after running migrations.
pub async fn ensure_groups(group_repo: &Arc<dyn GroupRepository>) -> Result<()> {
    group_repo
        .ensure(COMMON_GROUP)
        .await
        .context("Failed to ensure common group")?;
    group_repo
        .ensure(AUTHORS_GROUP)
        .await
        .context("Failed to ensure authors group")?;
    Ok(())
}

/// Validate a `next` redirect target supplied by the client.
///
/// Only single-slash relative paths are accepted; anything else (absolute
/// URLs, protocol-relative `//host` forms, empty strings) falls back to `/`.
pub fn safe_next_target(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") {
        next
    } else {
        "/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::db::pool::create_test_pool;
    use crate::db::repositories::SqlxGroupRepository;

    #[tokio::test]
    async fn test_ensure_groups_creates_both() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxGroupRepository::boxed(pool);

        ensure_groups(&repo).await.unwrap();

        assert!(repo.get_by_name(COMMON_GROUP).await.unwrap().is_some());
        assert!(repo.get_by_name(AUTHORS_GROUP).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ensure_groups_is_idempotent() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxGroupRepository::boxed(pool);

        ensure_groups(&repo).await.unwrap();
        ensure_groups(&repo).await.unwrap();

        let first = repo.get_by_name(COMMON_GROUP).await.unwrap().unwrap();
        ensure_groups(&repo).await.unwrap();
        let second = repo.get_by_name(COMMON_GROUP).await.unwrap().unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_safe_next_target_accepts_relative_path() {
        assert_eq!(safe_next_target("/articles/create"), "/articles/create");
        assert_eq!(safe_next_target("/"), "/");
    }

    #[test]
    fn test_safe_next_target_rejects_protocol_relative() {
        assert_eq!(safe_next_target("//evil.example.com/"), "/");
    }

    #[test]
    fn test_safe_next_target_rejects_absolute_url() {
        assert_eq!(safe_next_target("https://evil.example.com/"), "/");
        assert_eq!(safe_next_target("javascript:alert(1)"), "/");
    }

    #[test]
    fn test_safe_next_target_rejects_empty() {
        assert_eq!(safe_next_target(""), "/");
    }
}
