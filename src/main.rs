//! Gazette - a news and article publishing service

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gazette::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxAuthorRepository, SqlxCategoryRepository, SqlxCommentRepository,
            SqlxGroupRepository, SqlxPostRepository, SqlxSessionRepository,
            SqlxSubscriptionRepository, SqlxUserRepository,
        },
    },
    notify::{run_digest_scheduler, run_worker, Mailer, NotificationQueue},
    services::{
        ensure_groups, AuthorService, CategoryService, CommentService, PostService, UserService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazette=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gazette publishing service...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let group_repo = SqlxGroupRepository::boxed(pool.clone());
    let author_repo = SqlxAuthorRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let subscription_repo = SqlxSubscriptionRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());

    // Bootstrap the built-in groups
    ensure_groups(&group_repo).await?;
    tracing::info!("Groups initialized");

    // Initialize cache
    let cache = create_cache(&config.cache);
    tracing::info!("Cache initialized");

    // Notification queue; the sender is cloned into services, the receiver
    // goes to the worker task
    let (queue, queue_rx) = NotificationQueue::channel();

    // Initialize services
    let user_service = Arc::new(UserService::new(
        user_repo,
        session_repo,
        group_repo.clone(),
    ));
    let author_service = Arc::new(AuthorService::new(author_repo.clone(), group_repo));
    let post_service = Arc::new(PostService::new(
        post_repo.clone(),
        author_repo,
        queue,
    ));
    let category_service = Arc::new(CategoryService::new(
        category_repo,
        subscription_repo.clone(),
        cache,
    ));
    let comment_service = Arc::new(CommentService::new(comment_repo, post_repo.clone()));

    // Outgoing mail
    let mailer = Arc::new(Mailer::from_config(&config.email)?);
    tracing::info!(enabled = config.email.enabled, "Mailer initialized");

    // Background tasks: notification worker and the weekly digest scheduler
    tokio::spawn(run_worker(
        queue_rx,
        post_repo.clone(),
        subscription_repo.clone(),
        mailer.clone(),
        config.site.base_url.clone(),
    ));
    tokio::spawn(run_digest_scheduler(
        config.digest.clone(),
        post_repo,
        subscription_repo,
        mailer.clone(),
        config.site.base_url.clone(),
    ));
    tracing::info!("Background tasks started");

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        user_service,
        author_service,
        post_service,
        category_service,
        comment_service,
        mailer,
        site_name: config.site.name.clone(),
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
