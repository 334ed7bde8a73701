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

use super::model::{CreateLoopRegionRequest, LoopRegion, UpdateLoopRegionRequest};

#[axum::debug_handler]
pub async fn create_loop_region(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateLoopRegionRequest>,
) -> Result<impl IntoResponse, AppError> {
    Recitation::find_by_id(&state.pool, &req.recitation_id)
        .await?
        .ok_or(AppError::NotFound("Recitation"))?;

    gate::require_reviewer(&auth)?;

    let region = LoopRegion::create(&state.pool, req, &auth.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(region)))
}

#[axum::debug_handler]
pub async fn list_loop_regions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(recitation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recitation = Recitation::find_by_id(&state.pool, &recitation_id)
        .await?
        .ok_or(AppError::NotFound("Recitation"))?;

    gate::require_read(&auth, &recitation)?;

    let regions = LoopRegion::list_for_recitation(&state.pool, &recitation_id).await?;
    Ok((StatusCode::OK, success_to_api_response(regions)))
}

#[axum::debug_handler]
pub async fn update_loop_region(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(region_id): Path<String>,
    Json(req): Json<UpdateLoopRegionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let region = LoopRegion::find_by_id(&state.pool, &region_id)
        .await?
        .ok_or(AppError::NotFound("Loop region"))?;

    gate::require_author_or_admin(&auth, &region)?;

    let updated = LoopRegion::update(&state.pool, region, req).await?;
    Ok((StatusCode::OK, success_to_api_response(updated)))
}

#[axum::debug_handler]
pub async fn delete_loop_region(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(region_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let region = LoopRegion::find_by_id(&state.pool, &region_id)
        .await?
        .ok_or(AppError::NotFound("Loop region"))?;

    gate::require_author_or_admin(&auth, &region)?;

    LoopRegion::delete(&state.pool, &region.region_id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "deleted": true })),
    ))
}
