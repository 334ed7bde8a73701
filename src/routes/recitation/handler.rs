use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::access::{AuthUser, gate};
use crate::error::AppError;
use crate::routes::Pagination;
use crate::utils::success_to_api_response;
use crate::AppState;

use super::model::{CreateRecitationRequest, Recitation, UpdateRecitationRequest};

#[axum::debug_handler]
pub async fn create_recitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateRecitationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let recitation = Recitation::create(&state.pool, req, &auth.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(recitation)))
}

#[axum::debug_handler]
pub async fn list_recitations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let recitations =
        Recitation::list_for_owner(&state.pool, &auth.user_id, page.skip(), page.limit()).await?;
    Ok((StatusCode::OK, success_to_api_response(recitations)))
}

/// Review queue for scholars: every pending recitation with owner and
/// annotations attached.
#[axum::debug_handler]
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    gate::require_reviewer(&auth)?;

    let recitations = Recitation::list_pending(&state.pool, page.skip(), page.limit()).await?;
    let mut detailed = Vec::with_capacity(recitations.len());
    for recitation in recitations {
        detailed.push(recitation.with_details(&state.pool).await?);
    }

    Ok((StatusCode::OK, success_to_api_response(detailed)))
}

#[axum::debug_handler]
pub async fn get_recitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(recitation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recitation = Recitation::find_by_id(&state.pool, &recitation_id)
        .await?
        .ok_or(AppError::NotFound("Recitation"))?;

    gate::require_read(&auth, &recitation)?;

    let detailed = recitation.with_details(&state.pool).await?;
    Ok((StatusCode::OK, success_to_api_response(detailed)))
}

#[axum::debug_handler]
pub async fn update_recitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(recitation_id): Path<String>,
    Json(req): Json<UpdateRecitationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let recitation = Recitation::find_by_id(&state.pool, &recitation_id)
        .await?
        .ok_or(AppError::NotFound("Recitation"))?;

    // Only scholars and admins move a recitation out of pending.
    gate::require_reviewer(&auth)?;

    let updated = Recitation::update(&state.pool, recitation, req).await?;
    Ok((StatusCode::OK, success_to_api_response(updated)))
}
