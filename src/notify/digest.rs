//! Weekly digest
//!
//! Once a week, every subscriber with at least one new article in their
//! categories gets a per-recipient email listing the week's articles,
//! newest first, deduplicated across categories. The scheduler is a plain
//! sleep loop over local time.

use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::DigestConfig;
use crate::db::repositories::{PostRepository, SubscriptionRepository};
use crate::notify::mailer::Mailer;
use crate::notify::worker::article_link;

/// Digest window in days
const DIGEST_WINDOW_DAYS: i64 = 7;

const DIGEST_SUBJECT: &str = "Еженедельный дайджест новых статей";

/// Send the weekly digest to all affected subscribers.
///
/// Covers articles created in the trailing seven days. Returns the number
/// of digests sent. Per-recipient failures are logged and skipped.
pub async fn send_weekly_digest(
    post_repo: &Arc<dyn PostRepository>,
    subscription_repo: &Arc<dyn SubscriptionRepository>,
    mailer: &Mailer,
    base_url: &str,
) -> Result<usize> {
    let cutoff = Utc::now() - ChronoDuration::days(DIGEST_WINDOW_DAYS);
    let articles = post_repo.articles_since(cutoff).await?;
    if articles.is_empty() {
        info!("No recent articles, skipping weekly digest");
        return Ok(0);
    }

    let mut all_category_ids: Vec<i64> = articles
        .iter()
        .flat_map(|a| a.category_ids.iter().copied())
        .collect();
    all_category_ids.sort_unstable();
    all_category_ids.dedup();

    let mut category_emails: HashMap<i64, Vec<String>> = HashMap::new();
    for (email, category_id) in subscription_repo
        .subscribers_for_categories(&all_category_ids)
        .await?
    {
        category_emails.entry(category_id).or_default().push(email);
    }

    // Per recipient, the article lines newest first, each article once
    // even when several of their categories carry it.
    let mut recipient_lines: HashMap<String, Vec<String>> = HashMap::new();
    let mut recipient_seen: HashMap<String, HashSet<i64>> = HashMap::new();
    for article in &articles {
        let line = format!("- {}: {}", article.title, article_link(base_url, article.id));
        for category_id in &article.category_ids {
            let Some(emails) = category_emails.get(category_id) else {
                continue;
            };
            for email in emails {
                let seen = recipient_seen.entry(email.clone()).or_default();
                if seen.insert(article.id) {
                    recipient_lines
                        .entry(email.clone())
                        .or_default()
                        .push(line.clone());
                }
            }
        }
    }

    let mut sent = 0;
    for (email, lines) in recipient_lines {
        let body = format!("Новые статьи за неделю:\n\n{}", lines.join("\n"));
        match mailer.send(&[email.clone()], DIGEST_SUBJECT, &body).await {
            Ok(()) => sent += 1,
            Err(e) => warn!(email, "Failed to send digest: {:#}", e),
        }
    }

    info!(sent, "Weekly digest done");
    Ok(sent)
}

/// Run the digest on a weekly schedule until the process exits
pub async fn run_digest_scheduler(
    config: DigestConfig,
    post_repo: Arc<dyn PostRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    mailer: Arc<Mailer>,
    base_url: String,
) {
    loop {
        let delay = delay_until_next_run(Local::now().naive_local(), config.weekday, config.hour);
        info!(seconds = delay.as_secs(), "Next digest run scheduled");
        tokio::time::sleep(delay).await;

        if let Err(e) =
            send_weekly_digest(&post_repo, &subscription_repo, &mailer, &base_url).await
        {
            warn!("Weekly digest failed: {:#}", e);
        }
    }
}

/// Time until the next occurrence of `weekday` (0 = Monday) at `hour`:00
/// local time. A slot earlier today rolls over to next week.
fn delay_until_next_run(now: NaiveDateTime, weekday: u8, hour: u8) -> std::time::Duration {
    let weekday = u32::from(weekday % 7);
    let hour = u32::from(hour.min(23));
    let target_time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);

    let days_ahead =
        i64::from((weekday + 7 - now.weekday().num_days_from_monday()) % 7);
    let mut target = (now.date() + ChronoDuration::days(days_ahead)).and_time(target_time);
    if target <= now {
        target += ChronoDuration::days(7);
    }

    (target - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::db::pool::{create_test_pool, DynDatabasePool};
    use crate::db::repositories::{SqlxPostRepository, SqlxSubscriptionRepository};
    use crate::notify::mailer::testing::RecordingMailTransport;
    use chrono::NaiveDate;

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

    async fn seed_article(
        pool: &DynDatabasePool,
        id: i64,
        user_id: i64,
        title: &str,
        age: &str,
        category_ids: &[i64],
    ) {
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
            VALUES (?, ?, 'article', ?, 'body', 0, datetime('now', ?))
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(age)
        .execute(sqlite)
        .await
        .unwrap();
        for category_id in category_ids {
            sqlx::query("INSERT INTO post_categories (post_id, category_id) VALUES (?, ?)")
                .bind(id)
                .bind(category_id)
                .execute(sqlite)
                .await
                .unwrap();
        }
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
        sqlx::query("INSERT INTO category_subscriptions (user_id, category_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(category_id)
            .execute(sqlite)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_digest_dedups_across_categories_newest_first() {
        let f = setup().await;
        seed_user(&f.pool, 1, "alice", "alice@example.com").await;
        seed_category(&f.pool, 1, "Sport").await;
        seed_category(&f.pool, 2, "Politics").await;
        // Both categories carry article 1; alice subscribes to both
        seed_article(&f.pool, 1, 1, "Старая", "-3 days", &[1, 2]).await;
        seed_article(&f.pool, 2, 1, "Свежая", "-1 days", &[1]).await;
        seed_subscription(&f.pool, 1, 1).await;
        seed_subscription(&f.pool, 1, 2).await;

        let sent = send_weekly_digest(
            &f.post_repo,
            &f.subscription_repo,
            &f.mailer,
            "http://localhost:8080",
        )
        .await
        .unwrap();

        assert_eq!(sent, 1);
        let mails = f.transport.sent();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].subject, "Еженедельный дайджест новых статей");
        let expected = "Новые статьи за неделю:\n\n\
                        - Свежая: http://localhost:8080/articles/2\n\
                        - Старая: http://localhost:8080/articles/1";
        assert_eq!(mails[0].body, expected);
    }

    #[tokio::test]
    async fn test_digest_is_per_recipient() {
        let f = setup().await;
        seed_user(&f.pool, 1, "alice", "alice@example.com").await;
        seed_user(&f.pool, 2, "bob", "bob@example.com").await;
        seed_category(&f.pool, 1, "Sport").await;
        seed_category(&f.pool, 2, "Politics").await;
        seed_article(&f.pool, 1, 1, "Спорт", "-1 days", &[1]).await;
        seed_article(&f.pool, 2, 1, "Политика", "-2 days", &[2]).await;
        seed_subscription(&f.pool, 1, 1).await;
        seed_subscription(&f.pool, 2, 2).await;

        let sent = send_weekly_digest(
            &f.post_repo,
            &f.subscription_repo,
            &f.mailer,
            "http://localhost:8080",
        )
        .await
        .unwrap();

        assert_eq!(sent, 2);
        let mails = f.transport.sent();
        assert_eq!(mails.len(), 2);
        for mail in &mails {
            assert_eq!(mail.to.len(), 1);
        }
        let alice = mails
            .iter()
            .find(|m| m.to == vec!["alice@example.com".to_string()])
            .unwrap();
        assert!(alice.body.contains("Спорт"));
        assert!(!alice.body.contains("Политика"));
    }

    #[tokio::test]
    async fn test_digest_skips_old_articles() {
        let f = setup().await;
        seed_user(&f.pool, 1, "alice", "alice@example.com").await;
        seed_category(&f.pool, 1, "Sport").await;
        seed_article(&f.pool, 1, 1, "Старьё", "-10 days", &[1]).await;
        seed_subscription(&f.pool, 1, 1).await;

        let sent = send_weekly_digest(
            &f.post_repo,
            &f.subscription_repo,
            &f.mailer,
            "http://localhost:8080",
        )
        .await
        .unwrap();

        assert_eq!(sent, 0);
        assert!(f.transport.sent().is_empty());
    }

    fn wednesday_noon() -> NaiveDateTime {
        // 2026-08-05 is a Wednesday
        NaiveDate::from_ymd_opt(2026, 8, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_delay_until_next_monday_morning() {
        let delay = delay_until_next_run(wednesday_noon(), 0, 8);
        // Wednesday 12:00 to Monday 08:00 is 4 days 20 hours
        assert_eq!(delay.as_secs(), (4 * 24 + 20) * 3600);
    }

    #[test]
    fn test_delay_same_day_future_hour() {
        // Wednesday at 18:00, still today
        let delay = delay_until_next_run(wednesday_noon(), 2, 18);
        assert_eq!(delay.as_secs(), 6 * 3600);
    }

    #[test]
    fn test_delay_same_day_past_hour_rolls_over() {
        // Wednesday at 08:00 already passed, next Wednesday
        let delay = delay_until_next_run(wednesday_noon(), 2, 8);
        assert_eq!(delay.as_secs(), 7 * 24 * 3600 - 4 * 3600);
    }
}
