use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::access::{AuthUser, gate};
use crate::error::AppError;
use crate::routes::recitation::Recitation;
use crate::utils::success_to_api_response;
use crate::AppState;

use super::model::{CreateMarkerRequest, Marker, UpdateMarkerRequest};

#[axum::debug_handler]
pub async fn create_marker(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateMarkerRequest>,
) -> Result<impl IntoResponse, AppError> {
    Recitation::find_by_id(&state.pool, &req.recitation_id)
        .await?
        .ok_or(AppError::NotFound("Recitation"))?;

    gate::require_reviewer(&auth)?;

    let marker = Marker::create(&state.pool, req, &auth.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(marker)))
}

#[axum::debug_handler]
pub async fn list_markers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(recitation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recitation = Recitation::find_by_id(&state.pool, &recitation_id)
        .await?
        .ok_or(AppError::NotFound("Recitation"))?;

    gate::require_read(&auth, &recitation)?;

    let markers = Marker::list_for_recitation(&state.pool, &recitation_id).await?;
    Ok((StatusCode::OK, success_to_api_response(markers)))
}

#[axum::debug_handler]
pub async fn update_marker(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(marker_id): Path<String>,
    Json(req): Json<UpdateMarkerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let marker = Marker::find_by_id(&state.pool, &marker_id)
        .await?
        .ok_or(AppError::NotFound("Marker"))?;

    gate::require_author_or_admin(&auth, &marker)?;

    let updated = Marker::update(&state.pool, marker, req).await?;
    Ok((StatusCode::OK, success_to_api_response(updated)))
}

#[axum::debug_handler]
pub async fn delete_marker(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(marker_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let marker = Marker::find_by_id(&state.pool, &marker_id)
        .await?
        .ok_or(AppError::NotFound("Marker"))?;

    gate::require_author_or_admin(&auth, &marker)?;

    Marker::delete(&state.pool, &marker.marker_id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "deleted": true })),
    ))
}
