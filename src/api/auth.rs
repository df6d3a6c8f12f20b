//! Authentication API endpoints
//!
//! Handles HTTP requests for user accounts:
//! - POST /api/v1/auth/register - User registration
//! - POST /api/v1/auth/login - User login
//! - POST /api/v1/auth/logout - User logout
//! - GET /api/v1/auth/profile - Current user's profile
//! - PUT /api/v1/auth/profile - Update profile
//! - POST /api/v1/auth/become-author - Join the authors group

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Author, CreateUserInput, UpdateProfileInput, User};
use crate::services::safe_next_target;
use crate::services::user::SESSION_DURATION_DAYS;

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Response for user info
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for the current user's profile
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub is_author: bool,
}

/// Query parameters for become-author
#[derive(Debug, Default, Deserialize)]
pub struct BecomeAuthorQuery {
    pub next: Option<String>,
}

/// Response for become-author
#[derive(Debug, Serialize, Deserialize)]
pub struct BecomeAuthorResponse {
    pub author_id: i64,
    pub user_id: i64,
    pub rating: i64,
    /// Where the client should navigate next
    pub next: String,
}

impl BecomeAuthorResponse {
    fn new(author: Author, next: String) -> Self {
        Self {
            author_id: author.id,
            user_id: author.user_id,
            rating: author.rating,
            next,
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(get_profile))
        .route("/profile", put(update_profile))
        .route("/become-author", post(become_author))
}

fn session_cookie(token: &str) -> String {
    format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token,
        SESSION_DURATION_DAYS * 24 * 60 * 60
    )
}

fn set_cookie_headers(cookie: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(cookie)
            .map_err(|e| ApiError::internal_error(format!("Invalid cookie value: {}", e)))?,
    );
    Ok(headers)
}

/// POST /api/v1/auth/register - User registration
///
/// Registers the user, logs them in and sends the welcome email. A failed
/// welcome email is logged and does not fail the registration.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateUserInput {
        username: body.username,
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
    };

    let user = state.user_service.register(input).await?;
    let session = state.user_service.create_session(user.id).await?;

    if let Err(e) = state
        .mailer
        .send_welcome(&user.email, &user.username, &state.site_name)
        .await
    {
        warn!(user_id = user.id, "Welcome email failed: {:#}", e);
    }

    let headers = set_cookie_headers(&session_cookie(&session.id))?;
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/login - User login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state
        .user_service
        .login(&body.username_or_email, &body.password)
        .await?;

    let headers = set_cookie_headers(&session_cookie(&session.id))?;
    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout - User logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = crate::api::middleware::session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    let clear_cookie = "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";
    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, HeaderValue::from_static(clear_cookie));

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/profile - Current user's profile
async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let is_author = state.author_service.is_author(user.0.id).await?;
    Ok(Json(ProfileResponse {
        user: user.0.into(),
        is_author,
    }))
}

/// PUT /api/v1/auth/profile - Update first name, last name and email
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state.user_service.update_profile(user.0.id, body).await?;
    Ok(Json(updated.into()))
}

/// POST /api/v1/auth/become-author - Join the authors group
///
/// Idempotent. The optional `next` query parameter is echoed back when it
/// is a safe relative target, so the client can resume where it left off.
async fn become_author(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<BecomeAuthorQuery>,
) -> Result<Json<BecomeAuthorResponse>, ApiError> {
    let author = state.author_service.become_author(user.0.id).await?;
    let next = safe_next_target(query.next.as_deref().unwrap_or("/")).to_string();
    Ok(Json(BecomeAuthorResponse::new(author, next)))
}
