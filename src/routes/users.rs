// Profile management for the signed-in user

use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use validator::Validate;

use super::auth::{MessageResponse, UserResponse, load_current_user};
use crate::{
    AppState,
    auth,
    auth_middleware::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{ChangePasswordRequest, PublicUser, UpdateProfileRequest},
};

// GET /api/users/profile
pub async fn get_profile(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    tracing::info!("API call: get_profile for user: {}", authenticated_user.user_id);
    let user = load_current_user(&app_state, &authenticated_user).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

// PUT /api/users/profile
pub async fn update_profile(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    tracing::info!("API call: update_profile for user: {}", authenticated_user.user_id);

    let mut user = load_current_user(&app_state, &authenticated_user).await?;
    if let Some(first_name) = req.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if let Some(phone) = req.phone {
        user.phone = Some(phone);
    }
    if let Some(location) = req.location {
        user.location = Some(location);
    }
    user.updated_at = Utc::now();

    let user = app_state.users.save(user).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

// PUT /api/users/password
pub async fn change_password(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    WithRejection(Json(req), _): WithRejection<Json<ChangePasswordRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    tracing::info!("API call: change_password for user: {}", authenticated_user.user_id);

    let mut user = load_current_user(&app_state, &authenticated_user).await?;
    if !auth::verify_password(&req.current_password, &user.password_hash).await? {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }

    user.password_hash =
        auth::hash_password(&req.new_password, app_state.settings.bcrypt_cost).await?;
    user.updated_at = Utc::now();
    app_state.users.save(user).await?;

    // Other devices have to sign in again; the current access token runs out on its own
    auth::end_session(app_state.token_cache.as_ref(), &authenticated_user.user_id, None).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

// DELETE /api/users/account
pub async fn delete_account(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    tracing::info!("API call: delete_account for user: {}", authenticated_user.user_id);

    if !app_state.users.delete(&authenticated_user.user_id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    auth::end_session(
        app_state.token_cache.as_ref(),
        &authenticated_user.user_id,
        Some(&authenticated_user.claims),
    )
    .await?;
    Ok(Json(MessageResponse::new("Account deleted")))
}
