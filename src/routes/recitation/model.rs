use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::{Owned, Patch};
use crate::error::AppError;
use crate::routes::comment::Comment;
use crate::routes::marker::Marker;
use crate::routes::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recitation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecitationStatus {
    Pending,
    Reviewed,
    NeedsRevision,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Recitation {
    pub recitation_id: String,
    pub user_id: String,
    pub surah_name: String,
    pub ayah_start: i32,
    pub ayah_end: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    pub audio_file_path: Option<String>,
    pub duration: Option<f64>,
    pub status: RecitationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Owned for Recitation {
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRecitationRequest {
    pub surah_name: String,
    pub ayah_start: i32,
    pub ayah_end: i32,
    pub audio_data: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecitationRequest {
    #[serde(default)]
    pub status: Patch<RecitationStatus>,
}

impl UpdateRecitationRequest {
    pub fn apply(self, recitation: &mut Recitation) {
        self.status.apply_to(&mut recitation.status);
    }
}

/// A recitation together with its owner and annotations, as served to
/// reviewers.
#[derive(Debug, Serialize)]
pub struct RecitationWithDetails {
    #[serde(flatten)]
    pub recitation: Recitation,
    pub user: Option<User>,
    pub comments: Vec<Comment>,
    pub markers: Vec<Marker>,
}

const RECITATION_COLUMNS: &str = "recitation_id, user_id, surah_name, ayah_start, ayah_end, \
     audio_data, audio_file_path, duration, status, created_at, updated_at";

impl Recitation {
    pub async fn create(
        pool: &PgPool,
        req: CreateRecitationRequest,
        owner_id: &str,
    ) -> Result<Self, AppError> {
        if req.ayah_start < 1 || req.ayah_end < req.ayah_start {
            return Err(AppError::Validation(
                "Ayah range must be ordered and start at 1 or later".into(),
            ));
        }

        let recitation_id = Uuid::new_v4().to_string();
        let recitation = sqlx::query_as::<_, Recitation>(&format!(
            r#"
            INSERT INTO recitations (recitation_id, user_id, surah_name, ayah_start,
                                     ayah_end, audio_data, duration, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', NOW())
            RETURNING {RECITATION_COLUMNS}
            "#
        ))
        .bind(&recitation_id)
        .bind(owner_id)
        .bind(&req.surah_name)
        .bind(req.ayah_start)
        .bind(req.ayah_end)
        .bind(&req.audio_data)
        .bind(req.duration)
        .fetch_one(pool)
        .await?;

        Ok(recitation)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        recitation_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let recitation = sqlx::query_as::<_, Recitation>(&format!(
            "SELECT {RECITATION_COLUMNS} FROM recitations WHERE recitation_id = $1"
        ))
        .bind(recitation_id)
        .fetch_optional(pool)
        .await?;

        Ok(recitation)
    }

    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, AppError> {
        let recitations = sqlx::query_as::<_, Recitation>(&format!(
            r#"
            SELECT {RECITATION_COLUMNS} FROM recitations
            WHERE user_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(owner_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(recitations)
    }

    pub async fn list_pending(
        pool: &PgPool,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, AppError> {
        let recitations = sqlx::query_as::<_, Recitation>(&format!(
            r#"
            SELECT {RECITATION_COLUMNS} FROM recitations
            WHERE status = 'pending'
            ORDER BY created_at
            OFFSET $1 LIMIT $2
            "#
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(recitations)
    }

    pub async fn update(
        pool: &PgPool,
        mut recitation: Recitation,
        req: UpdateRecitationRequest,
    ) -> Result<Self, AppError> {
        req.apply(&mut recitation);

        let updated = sqlx::query_as::<_, Recitation>(&format!(
            r#"
            UPDATE recitations
            SET status = $2, updated_at = NOW()
            WHERE recitation_id = $1
            RETURNING {RECITATION_COLUMNS}
            "#
        ))
        .bind(&recitation.recitation_id)
        .bind(recitation.status)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }

    pub async fn with_details(self, pool: &PgPool) -> Result<RecitationWithDetails, AppError> {
        let user = User::find_by_id(pool, &self.user_id).await?;
        let comments = Comment::list_for_recitation(pool, &self.recitation_id).await?;
        let markers = Marker::list_for_recitation(pool, &self.recitation_id).await?;

        Ok(RecitationWithDetails {
            recitation: self,
            user,
            comments,
            markers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_recitation() -> Recitation {
        Recitation {
            recitation_id: "r1".into(),
            user_id: "u1".into(),
            surah_name: "Al-Fatiha".into(),
            ayah_start: 1,
            ayah_end: 7,
            audio_data: None,
            audio_file_path: None,
            duration: Some(42.5),
            status: RecitationStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn owner_is_the_recording_user() {
        assert_eq!(pending_recitation().owner_id(), Some("u1"));
    }

    #[test]
    fn status_patch_applies_without_touching_other_fields() {
        let mut recitation = pending_recitation();
        let req: UpdateRecitationRequest =
            serde_json::from_str(r#"{"status":"needs_revision"}"#).unwrap();
        req.apply(&mut recitation);
        assert_eq!(recitation.status, RecitationStatus::NeedsRevision);
        assert_eq!(recitation.surah_name, "Al-Fatiha");
    }

    #[test]
    fn empty_change_set_is_a_no_op() {
        let mut recitation = pending_recitation();
        let req: UpdateRecitationRequest = serde_json::from_str("{}").unwrap();
        req.apply(&mut recitation);
        assert_eq!(recitation.status, RecitationStatus::Pending);
    }
}
