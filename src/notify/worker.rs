//! Notification worker
//!
//! Drains the notification queue and sends subscriber emails. A failed or
//! impossible notification is logged and dropped; the worker itself only
//! stops when the queue closes.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::db::repositories::{PostRepository, SubscriptionRepository};
use crate::notify::mailer::Mailer;
use crate::notify::queue::NotificationJob;

/// Build the public link to an article
pub fn article_link(base_url: &str, post_id: i64) -> String {
    format!("{}/articles/{}", base_url.trim_end_matches('/'), post_id)
}

/// Run the notification worker until the queue closes
pub async fn run_worker(
    mut rx: UnboundedReceiver<NotificationJob>,
    post_repo: Arc<dyn PostRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    mailer: Arc<Mailer>,
    base_url: String,
) {
    while let Some(job) = rx.recv().await {
        if let Err(e) = handle_job(&job, &post_repo, &subscription_repo, &mailer, &base_url).await
        {
            warn!("Notification job failed: {:#}", e);
        }
    }
    debug!("Notification queue closed, worker exiting");
}

async fn handle_job(
    job: &NotificationJob,
    post_repo: &Arc<dyn PostRepository>,
    subscription_repo: &Arc<dyn SubscriptionRepository>,
    mailer: &Mailer,
    base_url: &str,
) -> Result<()> {
    match job {
        NotificationJob::ArticlePublished {
            post_id,
            category_ids,
        } => notify_article(post_repo, subscription_repo, mailer, base_url, *post_id, category_ids).await,
    }
}

/// Send the new-article notification to everyone subscribed to any of the
/// given categories.
///
/// The post is re-fetched; a post deleted before the worker got to it is
/// silently done. Recipients are deduplicated and all go on one message.
pub async fn notify_article(
    post_repo: &Arc<dyn PostRepository>,
    subscription_repo: &Arc<dyn SubscriptionRepository>,
    mailer: &Mailer,
    base_url: &str,
    post_id: i64,
    category_ids: &[i64],
) -> Result<()> {
    let post = match post_repo.get_by_id(post_id).await? {
        Some(post) => post,
        None => {
            debug!(post_id, "Post gone before notification, skipping");
            return Ok(());
        }
    };

    let emails = subscription_repo.emails_for_categories(category_ids).await?;
    if emails.is_empty() {
        return Ok(());
    }

    let subject = format!("Новая статья в ваших категориях: {}", post.title);
    let body = format!(
        "{}\n\nЧитать полностью: {}",
        post.preview(),
        article_link(base_url, post.id)
    );

    mailer.send(&emails, &subject, &body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::db::pool::{create_test_pool, DynDatabasePool};
    use crate::db::repositories::{SqlxPostRepository, SqlxSubscriptionRepository};
    use crate::notify::mailer::testing::RecordingMailTransport;
    use crate::notify::queue::NotificationQueue;

    struct Fixture {
        pool: DynDatabasePool,
        post_repo: Arc<dyn PostRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        transport: Arc<RecordingMailTransport>,
        mailer: Arc<Mailer>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let transport = Arc::new(RecordingMailTransport::default());
        Fixture {
            post_repo: SqlxPostRepository::boxed(pool.clone()),
            subscription_repo: SqlxSubscriptionRepository::boxed(pool.clone()),
            transport: transport.clone(),
            mailer: Arc::new(Mailer::with_transport(transport)),
            pool,
        }
    }

    async fn seed_user(pool: &DynDatabasePool, id: i64, username: &str, email: &str) {
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, 'hash', datetime('now'), datetime('now'))
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .execute(sqlite)
        .await
        .unwrap();
    }

    async fn seed_article(pool: &DynDatabasePool, id: i64, user_id: i64, title: &str, body: &str) {
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT OR IGNORE INTO authors (id, user_id, rating) VALUES (?, ?, 0)")
            .bind(user_id)
            .bind(user_id)
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, post_type, title, body, rating, created_at)
            VALUES (?, ?, 'article', ?, ?, 0, datetime('now'))
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(body)
        .execute(sqlite)
        .await
        .unwrap();
    }

    async fn seed_category(pool: &DynDatabasePool, id: i64, name: &str) {
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?, ?, datetime('now'))")
            .bind(id)
            .bind(name)
            .execute(sqlite)
            .await
            .unwrap();
    }

    async fn seed_subscription(pool: &DynDatabasePool, user_id: i64, category_id: i64) {
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query(
            "INSERT INTO category_subscriptions (user_id, category_id) VALUES (?, ?)",
        )
        .bind(user_id)
        .bind(category_id)
        .execute(sqlite)
        .await
        .unwrap();
    }

    #[test]
    fn test_article_link_strips_trailing_slash() {
        assert_eq!(
            article_link("http://localhost:8080/", 5),
            "http://localhost:8080/articles/5"
        );
        assert_eq!(
            article_link("https://gazette.example", 5),
            "https://gazette.example/articles/5"
        );
    }

    #[tokio::test]
    async fn test_notify_article_sends_one_message_to_all_subscribers() {
        let f = setup().await;
        seed_user(&f.pool, 1, "alice", "alice@example.com").await;
        seed_user(&f.pool, 2, "bob", "bob@example.com").await;
        seed_category(&f.pool, 1, "Sport").await;
        seed_category(&f.pool, 2, "Politics").await;
        seed_article(&f.pool, 1, 1, "Заголовок", "Текст статьи").await;
        // alice subscribes to both categories, bob to one
        seed_subscription(&f.pool, 1, 1).await;
        seed_subscription(&f.pool, 1, 2).await;
        seed_subscription(&f.pool, 2, 2).await;

        notify_article(
            &f.post_repo,
            &f.subscription_repo,
            &f.mailer,
            "http://localhost:8080",
            1,
            &[1, 2],
        )
        .await
        .unwrap();

        let sent = f.transport.sent();
        assert_eq!(sent.len(), 1);
        let mut to = sent[0].to.clone();
        to.sort();
        assert_eq!(
            to,
            vec!["alice@example.com".to_string(), "bob@example.com".to_string()]
        );
        assert_eq!(sent[0].subject, "Новая статья в ваших категориях: Заголовок");
        assert!(sent[0].body.starts_with("Текст статьи"));
        assert!(sent[0]
            .body
            .contains("Читать полностью: http://localhost:8080/articles/1"));
    }

    #[tokio::test]
    async fn test_notify_article_truncates_preview() {
        let f = setup().await;
        seed_user(&f.pool, 1, "alice", "alice@example.com").await;
        seed_category(&f.pool, 1, "Sport").await;
        let body = "ы".repeat(200);
        seed_article(&f.pool, 1, 1, "Длинная", &body).await;
        seed_subscription(&f.pool, 1, 1).await;

        notify_article(
            &f.post_repo,
            &f.subscription_repo,
            &f.mailer,
            "http://localhost:8080",
            1,
            &[1],
        )
        .await
        .unwrap();

        let sent = f.transport.sent();
        let preview: &str = sent[0].body.split("\n\n").next().unwrap();
        assert_eq!(preview.chars().count(), 127);
        assert!(preview.ends_with("..."));
    }

    #[tokio::test]
    async fn test_notify_article_missing_post_is_silent() {
        let f = setup().await;

        notify_article(
            &f.post_repo,
            &f.subscription_repo,
            &f.mailer,
            "http://localhost:8080",
            9999,
            &[1],
        )
        .await
        .unwrap();

        assert!(f.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notify_article_without_subscribers_sends_nothing() {
        let f = setup().await;
        seed_user(&f.pool, 1, "alice", "alice@example.com").await;
        seed_category(&f.pool, 1, "Sport").await;
        seed_article(&f.pool, 1, 1, "Заголовок", "Текст").await;

        notify_article(
            &f.post_repo,
            &f.subscription_repo,
            &f.mailer,
            "http://localhost:8080",
            1,
            &[1],
        )
        .await
        .unwrap();

        assert!(f.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_worker_drains_queue_until_close() {
        let f = setup().await;
        seed_user(&f.pool, 1, "alice", "alice@example.com").await;
        seed_category(&f.pool, 1, "Sport").await;
        seed_article(&f.pool, 1, 1, "Заголовок", "Текст").await;
        seed_subscription(&f.pool, 1, 1).await;

        let (queue, rx) = NotificationQueue::channel();
        let handle = tokio::spawn(run_worker(
            rx,
            f.post_repo.clone(),
            f.subscription_repo.clone(),
            f.mailer.clone(),
            "http://localhost:8080".to_string(),
        ));

        queue.enqueue(NotificationJob::ArticlePublished {
            post_id: 1,
            category_ids: vec![1],
        });
        // Unknown post: logged and dropped, must not kill the worker
        queue.enqueue(NotificationJob::ArticlePublished {
            post_id: 9999,
            category_ids: vec![1],
        });
        drop(queue);
        handle.await.unwrap();

        assert_eq!(f.transport.sent().len(), 1);
    }
}
