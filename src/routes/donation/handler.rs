use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::access::{AuthUser, gate};
use crate::error::AppError;
use crate::routes::Pagination;
use crate::utils::success_to_api_response;
use crate::AppState;

use super::model::{
    Campaign, CampaignWithProgress, CreateCampaignRequest, CreateDonationRequest, Donation,
    DonationStatus, UpdateCampaignRequest, UpdateDonationRequest,
};
use super::payment;

#[derive(Debug, Deserialize)]
pub struct ListDonationsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<DonationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub active_only: Option<bool>,
}

/// Anonymous callers are welcome; an attached identity links the donation
/// to its donor.
#[axum::debug_handler]
pub async fn initiate_donation(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Json(req): Json<CreateDonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transaction_id = payment::new_transaction_id();
    let reference = payment::new_payment_reference();
    let checkout = payment::checkout(&state.config, &transaction_id, &reference);

    let user_id = auth.as_ref().map(|Extension(a)| a.user_id.as_str());
    Donation::create(
        &state.pool,
        req,
        user_id,
        &transaction_id,
        &reference,
        &checkout.payment_url,
    )
    .await?;

    Ok((StatusCode::CREATED, success_to_api_response(checkout)))
}

/// Shares its path with anonymous donation creation, so identity is
/// enforced here rather than by the route group.
#[axum::debug_handler]
pub async fn list_donations(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Query(query): Query<ListDonationsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let Extension(auth) = auth.ok_or(AppError::Unauthorized)?;
    let page = Pagination {
        skip: query.skip,
        limit: query.limit,
    };
    let donations = Donation::list_for_owner(
        &state.pool,
        &auth.user_id,
        query.status,
        page.skip(),
        page.limit(),
    )
    .await?;

    Ok((StatusCode::OK, success_to_api_response(donations)))
}

#[axum::debug_handler]
pub async fn list_public_donations(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let donations = Donation::list_public(&state.pool, page.skip(), page.limit().min(20)).await?;
    Ok((StatusCode::OK, success_to_api_response(donations)))
}

#[axum::debug_handler]
pub async fn donation_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let stats = Donation::stats(&state.pool).await?;
    Ok((StatusCode::OK, success_to_api_response(stats)))
}

#[axum::debug_handler]
pub async fn update_donation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(donation_id): Path<String>,
    Json(req): Json<UpdateDonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let donation = Donation::find_by_id(&state.pool, &donation_id)
        .await?
        .ok_or(AppError::NotFound("Donation"))?;

    gate::require_admin(&auth)?;

    let updated = Donation::update(&state.pool, donation, req).await?;
    Ok((StatusCode::OK, success_to_api_response(updated)))
}

#[axum::debug_handler]
pub async fn create_campaign(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Extension(auth) = auth.ok_or(AppError::Unauthorized)?;
    gate::require_admin(&auth)?;

    let campaign = Campaign::create(&state.pool, req, &auth.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(campaign)))
}

#[axum::debug_handler]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination {
        skip: query.skip,
        limit: query.limit,
    };
    let campaigns = Campaign::list(
        &state.pool,
        query.active_only.unwrap_or(true),
        page.skip(),
        page.limit(),
    )
    .await?;

    let campaigns = campaigns
        .into_iter()
        .map(CampaignWithProgress::from)
        .collect::<Vec<_>>();

    Ok((StatusCode::OK, success_to_api_response(campaigns)))
}

#[axum::debug_handler]
pub async fn update_campaign(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(campaign_id): Path<String>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = Campaign::find_by_id(&state.pool, &campaign_id)
        .await?
        .ok_or(AppError::NotFound("Campaign"))?;

    gate::require_admin(&auth)?;

    let updated = Campaign::update(&state.pool, campaign, req).await?;
    Ok((StatusCode::OK, success_to_api_response(updated)))
}
