use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{self, TokenPair},
    auth_middleware::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{LoginRequest, PublicUser, RefreshRequest, RegisterRequest, Role, User},
};

// --- Response Wrappers ---

#[derive(Serialize)]
pub struct AuthResponse {
    success: bool,
    user: PublicUser,
    tokens: TokenPair,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: PublicUser,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

const BAD_CREDENTIALS: &str = "Invalid email or password";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Loads the user behind a verified access token
pub async fn load_current_user(app_state: &AppState, user: &AuthenticatedUser) -> AppResult<User> {
    app_state
        .users
        .find_by_id(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

// --- Handlers ---

// POST /api/auth/register
pub async fn register(
    State(app_state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let email = normalize_email(&req.email);
    tracing::info!("[HANDLER] /api/auth/register - Registration attempt for {}", email);

    // Early answer before paying for bcrypt; the store's create is the real guard
    if app_state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let password_hash = auth::hash_password(&req.password, app_state.settings.bcrypt_cost).await?;
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        phone: req.phone,
        location: req.location,
        role: Role::User,
        created_at: now,
        updated_at: now,
    };
    let user = app_state.users.create(user).await?;
    let tokens = auth::start_session(&app_state.tokens, app_state.token_cache.as_ref(), &user).await?;

    tracing::info!("[HANDLER] /api/auth/register - Created user {}", user.id);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user: PublicUser::from(&user),
            tokens,
        }),
    ))
}

// POST /api/auth/login
pub async fn login(
    State(app_state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let email = normalize_email(&req.email);
    tracing::info!("[HANDLER] /api/auth/login - Login attempt for {}", email);

    // Same answer for unknown email and wrong password
    let user = app_state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.into()))?;

    if !auth::verify_password(&req.password, &user.password_hash).await? {
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let tokens = auth::start_session(&app_state.tokens, app_state.token_cache.as_ref(), &user).await?;
    Ok(Json(AuthResponse {
        success: true,
        user: PublicUser::from(&user),
        tokens,
    }))
}

// POST /api/auth/refresh
pub async fn refresh(
    State(app_state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RefreshRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    let claims = auth::check_refresh_token(
        &app_state.tokens,
        app_state.token_cache.as_ref(),
        &req.refresh_token,
    )
    .await?;
    tracing::info!("[HANDLER] /api/auth/refresh - Rotating tokens for user {}", claims.sub);

    let user = app_state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

    // Storing the new refresh token invalidates the presented one
    let tokens = auth::start_session(&app_state.tokens, app_state.token_cache.as_ref(), &user).await?;
    Ok(Json(AuthResponse {
        success: true,
        user: PublicUser::from(&user),
        tokens,
    }))
}

// POST /api/auth/logout
pub async fn logout(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    tracing::info!("[HANDLER] /api/auth/logout - User {}", authenticated_user.user_id);
    auth::end_session(
        app_state.token_cache.as_ref(),
        &authenticated_user.user_id,
        Some(&authenticated_user.claims),
    )
    .await?;
    Ok(Json(MessageResponse::new("Logged out")))
}

// GET /api/auth/me
pub async fn me(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let user = load_current_user(&app_state, &authenticated_user).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}
