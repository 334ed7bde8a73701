use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::access::{AuthUser, gate, owns};
use crate::error::AppError;
use crate::routes::Pagination;
use crate::utils::success_to_api_response;
use crate::AppState;

use super::model::{
    CreateFeedbackRequest, Feedback, FeedbackCategory, FeedbackFilter, FeedbackPriority,
    FeedbackStatus, UpdateFeedbackRequest,
};

#[derive(Debug, Deserialize)]
pub struct ListFeedbackQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<FeedbackCategory>,
    pub priority: Option<FeedbackPriority>,
    pub status: Option<FeedbackStatus>,
    pub search: Option<String>,
}

#[axum::debug_handler]
pub async fn create_feedback(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Json(req): Json<CreateFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = auth.as_ref().map(|Extension(a)| a.user_id.as_str());
    let feedback = Feedback::create(&state.pool, req, user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(feedback)))
}

/// Shares its path with anonymous feedback creation, so identity is
/// enforced here rather than by the route group.
#[axum::debug_handler]
pub async fn list_feedback(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Query(query): Query<ListFeedbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    let Extension(auth) = auth.ok_or(AppError::Unauthorized)?;

    // Admins browse everything; everyone else sees only their own rows.
    let owner = if auth.role.is_admin() {
        None
    } else {
        Some(auth.user_id.as_str())
    };

    let filter = FeedbackFilter {
        category: query.category,
        priority: query.priority,
        status: query.status,
        search: query.search,
    };
    let page = Pagination {
        skip: query.skip,
        limit: query.limit,
    };
    let feedback = Feedback::list(&state.pool, owner, &filter, page.skip(), page.limit()).await?;

    Ok((StatusCode::OK, success_to_api_response(feedback)))
}

#[axum::debug_handler]
pub async fn get_feedback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(feedback_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let feedback = Feedback::find_by_id(&state.pool, &feedback_id)
        .await?
        .ok_or(AppError::NotFound("Feedback"))?;

    if !auth.role.is_admin() && !owns(&auth, &feedback) {
        return Err(AppError::PermissionDenied);
    }

    Ok((StatusCode::OK, success_to_api_response(feedback)))
}

#[axum::debug_handler]
pub async fn update_feedback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(feedback_id): Path<String>,
    Json(req): Json<UpdateFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let feedback = Feedback::find_by_id(&state.pool, &feedback_id)
        .await?
        .ok_or(AppError::NotFound("Feedback"))?;

    let change_set = req.authorize(&auth, &feedback)?;
    let updated = Feedback::update(&state.pool, feedback, change_set, &auth).await?;

    Ok((StatusCode::OK, success_to_api_response(updated)))
}

#[axum::debug_handler]
pub async fn delete_feedback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(feedback_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let feedback = Feedback::find_by_id(&state.pool, &feedback_id)
        .await?
        .ok_or(AppError::NotFound("Feedback"))?;

    if !auth.role.is_admin() && !owns(&auth, &feedback) {
        return Err(AppError::PermissionDenied);
    }

    Feedback::delete(&state.pool, &feedback.feedback_id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "deleted": true })),
    ))
}

#[axum::debug_handler]
pub async fn feedback_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    gate::require_admin(&auth)?;

    let summary = Feedback::summary(&state.pool).await?;
    Ok((StatusCode::OK, success_to_api_response(summary)))
}
