use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::access::{AuthUser, gate, owns};
use crate::error::AppError;
use crate::routes::Pagination;
use crate::routes::recitation::Recitation;
use crate::utils::success_to_api_response;
use crate::AppState;

use super::model::{Comment, CreateCommentRequest, UpdateCommentRequest};

#[axum::debug_handler]
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let recitation = Recitation::find_by_id(&state.pool, &req.recitation_id)
        .await?
        .ok_or(AppError::NotFound("Recitation"))?;

    gate::require_reviewer(&auth)?;

    // The subject is the recitation's owner, captured at create time.
    let comment = Comment::create(&state.pool, req, &auth.user_id, &recitation.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(comment)))
}

#[axum::debug_handler]
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(recitation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recitation = Recitation::find_by_id(&state.pool, &recitation_id)
        .await?
        .ok_or(AppError::NotFound("Recitation"))?;

    gate::require_read(&auth, &recitation)?;

    let comments = Comment::list_for_recitation(&state.pool, &recitation_id).await?;
    Ok((StatusCode::OK, success_to_api_response(comments)))
}

/// Feedback addressed to the caller's own recitations.
#[axum::debug_handler]
pub async fn my_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let comments =
        Comment::list_for_subject(&state.pool, &auth.user_id, page.skip(), page.limit()).await?;
    Ok((StatusCode::OK, success_to_api_response(comments)))
}

#[axum::debug_handler]
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<String>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = Comment::find_by_id(&state.pool, &comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment"))?;

    // The author edits their note, the subject resolves it, admins both.
    if !gate::can_edit_authored(&auth, &comment) && !owns(&auth, &comment) {
        return Err(AppError::PermissionDenied);
    }

    let updated = Comment::update(&state.pool, comment, req).await?;
    Ok((StatusCode::OK, success_to_api_response(updated)))
}

#[axum::debug_handler]
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let comment = Comment::find_by_id(&state.pool, &comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment"))?;

    gate::require_author_or_admin(&auth, &comment)?;

    Comment::delete(&state.pool, &comment.comment_id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "deleted": true })),
    ))
}
