use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::access::{Owned, Patch};
use crate::error::AppError;
use crate::routes::user::User;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Community {
    pub community_id: String,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Community-scoped role, distinct from the platform role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Member,
    Admin,
}

/// A user's relationship to a community. At most one row per
/// (user, community) pair: leaving soft-deletes via `is_active`, rejoining
/// reactivates the same row. History is never deleted.
#[derive(Debug, Serialize, FromRow)]
pub struct Membership {
    pub membership_id: String,
    pub community_id: String,
    pub user_id: String,
    pub role: MembershipRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl Owned for Membership {
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

/// Lifecycle position of a (user, community) pair:
/// absent -> active -> inactive -> active -> ...
/// `Absent` is unreachable from `Inactive`; membership history is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipState {
    Absent,
    Active,
    Inactive,
}

impl MembershipState {
    pub fn of(row: Option<&Membership>) -> Self {
        match row {
            None => MembershipState::Absent,
            Some(m) if m.is_active => MembershipState::Active,
            Some(_) => MembershipState::Inactive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAction {
    Insert,
    Reactivate,
}

/// Decides what `join` does. Joining while already active fails loud
/// rather than silently succeeding.
pub fn join_transition(state: MembershipState) -> Result<JoinAction, AppError> {
    match state {
        MembershipState::Absent => Ok(JoinAction::Insert),
        MembershipState::Inactive => Ok(JoinAction::Reactivate),
        MembershipState::Active => Err(AppError::AlreadyMember),
    }
}

/// `leave` requires an active row; a second leave fails with NotMember
/// instead of being silently ignored.
pub fn leave_transition(state: MembershipState) -> Result<(), AppError> {
    match state {
        MembershipState::Active => Ok(()),
        MembershipState::Absent | MembershipState::Inactive => Err(AppError::NotMember),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommunityRequest {
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommunityRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<Option<String>>,
    #[serde(default)]
    pub address: Patch<Option<String>>,
    #[serde(default)]
    pub location: Patch<Option<String>>,
    #[serde(default)]
    pub is_active: Patch<bool>,
}

impl UpdateCommunityRequest {
    pub fn apply(self, community: &mut Community) {
        self.name.apply_to(&mut community.name);
        self.description.apply_to(&mut community.description);
        self.address.apply_to(&mut community.address);
        self.location.apply_to(&mut community.location);
        self.is_active.apply_to(&mut community.is_active);
    }
}

#[derive(Debug, Serialize)]
pub struct CommunityWithMembers {
    #[serde(flatten)]
    pub community: Community,
    pub member_count: i64,
    pub scholar_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<User>>,
}

#[derive(Debug, Serialize)]
pub struct CommunityStats {
    pub total_members: i64,
    pub total_scholars: i64,
    pub active_members: i64,
}

const COMMUNITY_CACHE_EXPIRE: u64 = 600;
const COMMUNITY_ID_CACHE_PREFIX: &str = "community:id:";

const COMMUNITY_COLUMNS: &str = "community_id, name, description, address, location, \
     is_active, created_by, created_at, updated_at";

const MEMBERSHIP_COLUMNS: &str =
    "membership_id, community_id, user_id, role, is_active, joined_at, left_at";

impl Community {
    /// Creates the community and enrolls the creator as a community admin
    /// in one transaction.
    pub async fn create(
        pool: &PgPool,
        req: CreateCommunityRequest,
        creator_id: &str,
    ) -> Result<Self, AppError> {
        let community_id = Uuid::new_v4().to_string();
        let mut tx = pool.begin().await?;

        let community = sqlx::query_as::<_, Community>(&format!(
            r#"
            INSERT INTO communities (community_id, name, description, address, location,
                                     is_active, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, true, $6, NOW())
            RETURNING {COMMUNITY_COLUMNS}
            "#
        ))
        .bind(&community_id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.address)
        .bind(&req.location)
        .bind(creator_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO community_memberships
                (membership_id, community_id, user_id, role, is_active, joined_at)
            VALUES ($1, $2, $3, 'admin', true, NOW())
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&community_id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(community)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        community_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let cache_key = format!("{}{}", COMMUNITY_ID_CACHE_PREFIX, community_id);

        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cached: redis::RedisResult<String> = conn.get(&cache_key).await;

            if let Ok(json_str) = cached {
                if let Ok(community) = serde_json::from_str::<Community>(&json_str) {
                    tracing::debug!("Get community from cache: {}", cache_key);
                    return Ok(Some(community));
                }
            }
        }

        let community = sqlx::query_as::<_, Community>(&format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities WHERE community_id = $1"
        ))
        .bind(community_id)
        .fetch_optional(pool)
        .await?;

        if let Some(ref c) = community {
            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                if let Ok(json_str) = serde_json::to_string(c) {
                    let _: Result<(), redis::RedisError> = conn
                        .set_ex(&cache_key, json_str, COMMUNITY_CACHE_EXPIRE)
                        .await;
                    tracing::debug!("Set community to cache: {}", cache_key);
                }
            }
        }

        Ok(community)
    }

    async fn invalidate_cache(redis: &Arc<RedisClient>, community_id: &str) {
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cache_key = format!("{}{}", COMMUNITY_ID_CACHE_PREFIX, community_id);
            let _: Result<(), redis::RedisError> = conn.del(&cache_key).await;
        }
    }

    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, AppError> {
        let pattern = search.map(|s| format!("%{}%", s));
        let communities = sqlx::query_as::<_, Community>(&format!(
            r#"
            SELECT {COMMUNITY_COLUMNS} FROM communities
            WHERE is_active = true
              AND ($1::TEXT IS NULL
                   OR name ILIKE $1 OR description ILIKE $1 OR location ILIKE $1)
            ORDER BY created_at
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(pattern)
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(communities)
    }

    /// Communities where the user holds an active membership.
    pub async fn list_for_member(pool: &PgPool, user_id: &str) -> Result<Vec<Self>, AppError> {
        let communities = sqlx::query_as::<_, Community>(
            r#"
            SELECT c.community_id, c.name, c.description, c.address, c.location,
                   c.is_active, c.created_by, c.created_at, c.updated_at
            FROM communities c
            JOIN community_memberships m ON m.community_id = c.community_id
            WHERE m.user_id = $1 AND m.is_active = true
            ORDER BY m.joined_at
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(communities)
    }

    pub async fn member_counts(
        pool: &PgPool,
        community_id: &str,
    ) -> Result<(i64, i64), AppError> {
        let member_count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM community_memberships
            WHERE community_id = $1 AND is_active = true
            "#,
        )
        .bind(community_id)
        .fetch_one(pool)
        .await?;

        let scholar_count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM community_memberships m
            JOIN users u ON u.user_id = m.user_id
            WHERE m.community_id = $1 AND m.is_active = true
              AND u.role IN ('scholar', 'admin')
            "#,
        )
        .bind(community_id)
        .fetch_one(pool)
        .await?;

        Ok((member_count, scholar_count))
    }

    pub async fn members(pool: &PgPool, community_id: &str) -> Result<Vec<User>, AppError> {
        let members = sqlx::query_as::<_, User>(
            r#"
            SELECT u.user_id, u.email, u.username, u.password_hash, u.full_name,
                   u.role, u.is_active, u.is_verified, u.created_at, u.updated_at
            FROM users u
            JOIN community_memberships m ON m.user_id = u.user_id
            WHERE m.community_id = $1 AND m.is_active = true
            ORDER BY m.joined_at
            "#,
        )
        .bind(community_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn update(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        mut community: Community,
        req: UpdateCommunityRequest,
    ) -> Result<Self, AppError> {
        req.apply(&mut community);

        let updated = sqlx::query_as::<_, Community>(&format!(
            r#"
            UPDATE communities
            SET name = $2, description = $3, address = $4, location = $5,
                is_active = $6, updated_at = NOW()
            WHERE community_id = $1
            RETURNING {COMMUNITY_COLUMNS}
            "#
        ))
        .bind(&community.community_id)
        .bind(&community.name)
        .bind(&community.description)
        .bind(&community.address)
        .bind(&community.location)
        .bind(community.is_active)
        .fetch_one(pool)
        .await?;

        Self::invalidate_cache(redis, &updated.community_id).await;

        Ok(updated)
    }
}

impl Membership {
    pub async fn find(
        pool: &PgPool,
        community_id: &str,
        user_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            SELECT {MEMBERSHIP_COLUMNS} FROM community_memberships
            WHERE community_id = $1 AND user_id = $2
            "#
        ))
        .bind(community_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// True iff the user is an active community-scoped admin.
    pub async fn is_community_admin(
        pool: &PgPool,
        community_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        let membership = Self::find(pool, community_id, user_id).await?;
        Ok(matches!(
            membership,
            Some(ref m) if m.is_active && m.role == MembershipRole::Admin
        ))
    }

    /// Runs the join transition under a row lock so two racing joins
    /// cannot produce a second membership row for the same pair.
    pub async fn join(
        pool: &PgPool,
        community_id: &str,
        user_id: &str,
    ) -> Result<Self, AppError> {
        let mut tx = pool.begin().await?;

        let existing = sqlx::query_as::<_, Membership>(&format!(
            r#"
            SELECT {MEMBERSHIP_COLUMNS} FROM community_memberships
            WHERE community_id = $1 AND user_id = $2
            FOR UPDATE
            "#
        ))
        .bind(community_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let membership = match join_transition(MembershipState::of(existing.as_ref()))? {
            JoinAction::Insert => {
                sqlx::query_as::<_, Membership>(&format!(
                    r#"
                    INSERT INTO community_memberships
                        (membership_id, community_id, user_id, role, is_active, joined_at)
                    VALUES ($1, $2, $3, 'member', true, NOW())
                    RETURNING {MEMBERSHIP_COLUMNS}
                    "#
                ))
                .bind(Uuid::new_v4().to_string())
                .bind(community_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?
            }
            JoinAction::Reactivate => {
                sqlx::query_as::<_, Membership>(&format!(
                    r#"
                    UPDATE community_memberships
                    SET is_active = true, left_at = NULL
                    WHERE community_id = $1 AND user_id = $2
                    RETURNING {MEMBERSHIP_COLUMNS}
                    "#
                ))
                .bind(community_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(membership)
    }

    /// Deactivates the caller's active row, stamping `left_at`. The row is
    /// kept; a later join reactivates it.
    pub async fn leave(
        pool: &PgPool,
        community_id: &str,
        user_id: &str,
    ) -> Result<Self, AppError> {
        let mut tx = pool.begin().await?;

        let existing = sqlx::query_as::<_, Membership>(&format!(
            r#"
            SELECT {MEMBERSHIP_COLUMNS} FROM community_memberships
            WHERE community_id = $1 AND user_id = $2
            FOR UPDATE
            "#
        ))
        .bind(community_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        leave_transition(MembershipState::of(existing.as_ref()))?;

        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE community_memberships
            SET is_active = false, left_at = NOW()
            WHERE community_id = $1 AND user_id = $2
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(community_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(is_active: bool) -> Membership {
        Membership {
            membership_id: "mb1".into(),
            community_id: "cm1".into(),
            user_id: "u1".into(),
            role: MembershipRole::Member,
            is_active,
            joined_at: Utc::now(),
            left_at: if is_active { None } else { Some(Utc::now()) },
        }
    }

    #[test]
    fn state_is_derived_from_the_row() {
        assert_eq!(MembershipState::of(None), MembershipState::Absent);
        assert_eq!(
            MembershipState::of(Some(&membership(true))),
            MembershipState::Active
        );
        assert_eq!(
            MembershipState::of(Some(&membership(false))),
            MembershipState::Inactive
        );
    }

    #[test]
    fn first_join_inserts() {
        assert_eq!(
            join_transition(MembershipState::Absent).unwrap(),
            JoinAction::Insert
        );
    }

    #[test]
    fn rejoin_reactivates_instead_of_duplicating() {
        assert_eq!(
            join_transition(MembershipState::Inactive).unwrap(),
            JoinAction::Reactivate
        );
    }

    #[test]
    fn join_while_active_fails_loud() {
        assert!(matches!(
            join_transition(MembershipState::Active),
            Err(AppError::AlreadyMember)
        ));
    }

    #[test]
    fn leave_requires_an_active_row() {
        assert!(leave_transition(MembershipState::Active).is_ok());
        // A second leave hits the now-inactive row and fails.
        assert!(matches!(
            leave_transition(MembershipState::Inactive),
            Err(AppError::NotMember)
        ));
        assert!(matches!(
            leave_transition(MembershipState::Absent),
            Err(AppError::NotMember)
        ));
    }

    #[test]
    fn community_update_patches_only_supplied_fields() {
        let mut community = Community {
            community_id: "cm1".into(),
            name: "Masjid An-Nur".into(),
            description: Some("Weekly tajweed circle".into()),
            address: None,
            location: Some("Kano".into()),
            is_active: true,
            created_by: "s1".into(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let req: UpdateCommunityRequest =
            serde_json::from_str(r#"{"location":"Abuja"}"#).unwrap();
        req.apply(&mut community);
        assert_eq!(community.location.as_deref(), Some("Abuja"));
        assert_eq!(community.name, "Masjid An-Nur");
        assert_eq!(community.description.as_deref(), Some("Weekly tajweed circle"));
    }
}
