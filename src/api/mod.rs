//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the Gazette publishing
//! service. It includes:
//! - News API endpoints
//! - Article API endpoints
//! - Category and subscription API endpoints
//! - Comment API endpoints
//! - Post rating endpoints
//! - User/Auth API endpoints

pub mod articles;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod middleware;
pub mod news;
pub mod posts;
pub mod responses;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Publishing routes (need authorship)
    let author_routes = Router::new()
        .route("/news", post(news::create_news))
        .route("/news/{id}", put(news::update_news))
        .route("/news/{id}", delete(news::delete_news))
        .route("/articles", post(articles::create_article))
        .route("/articles/{id}", put(articles::update_article))
        .route("/articles/{id}", delete(articles::delete_article))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_author,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not authorship)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route("/categories/{id}/subscribe", post(categories::subscribe))
        .route(
            "/categories/{id}/unsubscribe",
            post(categories::unsubscribe),
        )
        .route("/comments", post(comments::create_comment))
        .route("/comments/{id}/like", post(comments::like_comment))
        .route("/comments/{id}/dislike", post(comments::dislike_comment))
        .route("/posts/{id}/like", post(posts::like_post))
        .route("/posts/{id}/dislike", post(posts::dislike_post))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Category detail carries a per-user `subscribed` flag, so it accepts
    // but does not require a session
    let category_detail = Router::new()
        .route("/categories/{id}", get(categories::get_category))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    // Public routes
    Router::new()
        .route("/news", get(news::list_news))
        .route("/news/search", get(news::search_news))
        .route("/news/{id}", get(news::get_news))
        .route("/articles", get(articles::list_articles))
        .route("/articles/search", get(articles::search_articles))
        .route("/articles/{id}", get(articles::get_article))
        .route("/categories", get(categories::list_categories))
        .route("/posts/{id}/comments", get(comments::list_comments))
        .nest("/auth", auth::public_router())
        .merge(category_detail)
        .merge(author_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{}'", cors_origin))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
