use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::access::{AuthUser, gate};
use crate::error::AppError;
use crate::routes::Pagination;
use crate::utils::{generate_token, success_to_api_response};
use crate::AppState;

use super::model::{AuthResponse, LoginRequest, RegisterRequest, UpdateUserRequest, User};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !req
        .username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username may only contain letters, digits and underscores".into(),
        ));
    }
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(AppError::Validation(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if req.password.len() < 6 || req.password.len() > 72 {
        return Err(AppError::Validation(
            "Password must be between 6 and 72 characters".into(),
        ));
    }

    let user = User::create(&state.pool, req).await?;
    let (token, expires_at) = generate_token(&user.user_id, &state.config)
        .map_err(|_| AppError::Validation("Failed to issue token".into()))?;

    Ok((
        StatusCode::CREATED,
        success_to_api_response(AuthResponse {
            user_id: user.user_id,
            username: user.username,
            role: user.role,
            token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_username(&state.pool, &req.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.is_active || !user.verify_login(&req.password).await? {
        return Err(AppError::Unauthorized);
    }

    let (token, expires_at) = generate_token(&user.user_id, &state.config)
        .map_err(|_| AppError::Unauthorized)?;

    Ok((
        StatusCode::OK,
        success_to_api_response(AuthResponse {
            user_id: user.user_id,
            username: user.username,
            role: user.role,
            token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_id(&state.pool, &auth.user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok((StatusCode::OK, success_to_api_response(user)))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    gate::require_admin(&auth)?;

    let users = User::list(&state.pool, page.skip(), page.limit()).await?;
    Ok((StatusCode::OK, success_to_api_response(users)))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    gate::require_admin(&auth)?;

    let user = User::find_by_id(&state.pool, &user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok((StatusCode::OK, success_to_api_response(user)))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    gate::require_admin(&auth)?;

    let user = User::update(&state.pool, &user_id, req).await?;
    Ok((StatusCode::OK, success_to_api_response(user)))
}
