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
    Community, CommunityStats, CommunityWithMembers, CreateCommunityRequest, Membership,
    UpdateCommunityRequest,
};

#[derive(Debug, Deserialize)]
pub struct ListCommunitiesQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[axum::debug_handler]
pub async fn create_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateCommunityRequest>,
) -> Result<impl IntoResponse, AppError> {
    gate::require_reviewer(&auth)?;

    let community = Community::create(&state.pool, req, &auth.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(community)))
}

#[axum::debug_handler]
pub async fn list_communities(
    State(state): State<AppState>,
    Query(query): Query<ListCommunitiesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination {
        skip: query.skip,
        limit: query.limit,
    };
    let communities =
        Community::list(&state.pool, query.search.as_deref(), page.skip(), page.limit()).await?;

    Ok((StatusCode::OK, success_to_api_response(communities)))
}

#[axum::debug_handler]
pub async fn my_communities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let communities = Community::list_for_member(&state.pool, &auth.user_id).await?;

    let mut detailed = Vec::with_capacity(communities.len());
    for community in communities {
        let (member_count, scholar_count) =
            Community::member_counts(&state.pool, &community.community_id).await?;
        detailed.push(CommunityWithMembers {
            community,
            member_count,
            scholar_count,
            members: None,
        });
    }

    Ok((StatusCode::OK, success_to_api_response(detailed)))
}

#[axum::debug_handler]
pub async fn get_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(community_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let community = Community::find_by_id(&state.pool, &state.redis, &community_id)
        .await?
        .ok_or(AppError::NotFound("Community"))?;

    let (member_count, scholar_count) =
        Community::member_counts(&state.pool, &community_id).await?;

    // The member list is only visible to active members.
    let membership = Membership::find(&state.pool, &community_id, &auth.user_id).await?;
    let members = match membership {
        Some(ref m) if m.is_active => Some(Community::members(&state.pool, &community_id).await?),
        _ => None,
    };

    Ok((
        StatusCode::OK,
        success_to_api_response(CommunityWithMembers {
            community,
            member_count,
            scholar_count,
            members,
        }),
    ))
}

#[axum::debug_handler]
pub async fn update_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(community_id): Path<String>,
    Json(req): Json<UpdateCommunityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let community = Community::find_by_id(&state.pool, &state.redis, &community_id)
        .await?
        .ok_or(AppError::NotFound("Community"))?;

    // Platform admins, or the community's own admins.
    if !auth.role.is_admin()
        && !Membership::is_community_admin(&state.pool, &community_id, &auth.user_id).await?
    {
        return Err(AppError::PermissionDenied);
    }

    let updated = Community::update(&state.pool, &state.redis, community, req).await?;
    Ok((StatusCode::OK, success_to_api_response(updated)))
}

#[axum::debug_handler]
pub async fn join_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(community_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Community::find_by_id(&state.pool, &state.redis, &community_id)
        .await?
        .ok_or(AppError::NotFound("Community"))?;

    let membership = Membership::join(&state.pool, &community_id, &auth.user_id).await?;
    Ok((StatusCode::OK, success_to_api_response(membership)))
}

#[axum::debug_handler]
pub async fn leave_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(community_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let membership = Membership::leave(&state.pool, &community_id, &auth.user_id).await?;
    Ok((StatusCode::OK, success_to_api_response(membership)))
}

#[axum::debug_handler]
pub async fn community_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(community_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Community::find_by_id(&state.pool, &state.redis, &community_id)
        .await?
        .ok_or(AppError::NotFound("Community"))?;

    // Stats are for active members and platform admins.
    let membership = Membership::find(&state.pool, &community_id, &auth.user_id).await?;
    let is_member = matches!(membership, Some(ref m) if m.is_active);
    if !is_member && !auth.role.is_admin() {
        return Err(AppError::PermissionDenied);
    }

    let (total_members, total_scholars) =
        Community::member_counts(&state.pool, &community_id).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(CommunityStats {
            total_members,
            total_scholars,
            active_members: total_members,
        }),
    ))
}
