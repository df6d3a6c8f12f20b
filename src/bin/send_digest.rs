//! Runs the weekly digest once and exits.
//!
//! Usage: `cargo run --bin send-digest`
//!
//! Sends the same digest the in-process scheduler would, using the
//! configuration from `config.yml` and the environment.

use std::path::Path;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gazette::config::Config;
use gazette::db::{
    self,
    repositories::{SqlxGroupRepository, SqlxPostRepository, SqlxSubscriptionRepository},
};
use gazette::notify::{send_weekly_digest, Mailer};
use gazette::services::ensure_groups;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazette=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;
    ensure_groups(&SqlxGroupRepository::boxed(pool.clone())).await?;

    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let subscription_repo = SqlxSubscriptionRepository::boxed(pool.clone());
    let mailer = Mailer::from_config(&config.email)?;

    let sent = send_weekly_digest(
        &post_repo,
        &subscription_repo,
        &mailer,
        &config.site.base_url,
    )
    .await?;
    println!("Digest sent to {} recipients", sent);

    Ok(())
}
