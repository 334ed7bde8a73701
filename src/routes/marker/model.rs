use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::{Authored, Patch};
use crate::error::AppError;

/// A point annotation a scholar drops on the recitation timeline.
#[derive(Debug, Serialize, FromRow)]
pub struct Marker {
    pub marker_id: String,
    pub recitation_id: String,
    pub author_id: String,
    pub timestamp: f64,
    pub label: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Authored for Marker {
    fn author_id(&self) -> Option<&str> {
        Some(&self.author_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMarkerRequest {
    pub recitation_id: String,
    pub timestamp: f64,
    pub label: String,
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: Option<String>,
    #[serde(default = "default_color")]
    pub color: Option<String>,
}

fn default_category() -> Option<String> {
    Some("general".to_string())
}

fn default_color() -> Option<String> {
    Some("#f59e0b".to_string())
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMarkerRequest {
    #[serde(default)]
    pub label: Patch<String>,
    #[serde(default)]
    pub description: Patch<Option<String>>,
    #[serde(default)]
    pub category: Patch<Option<String>>,
    #[serde(default)]
    pub color: Patch<Option<String>>,
}

impl UpdateMarkerRequest {
    pub fn apply(self, marker: &mut Marker) {
        self.label.apply_to(&mut marker.label);
        self.description.apply_to(&mut marker.description);
        self.category.apply_to(&mut marker.category);
        self.color.apply_to(&mut marker.color);
    }
}

const MARKER_COLUMNS: &str = "marker_id, recitation_id, author_id, timestamp, label, \
     description, category, color, created_at, updated_at";

impl Marker {
    pub async fn create(
        pool: &PgPool,
        req: CreateMarkerRequest,
        author_id: &str,
    ) -> Result<Self, AppError> {
        let marker_id = Uuid::new_v4().to_string();
        let marker = sqlx::query_as::<_, Marker>(&format!(
            r#"
            INSERT INTO markers (marker_id, recitation_id, author_id, timestamp,
                                 label, description, category, color, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING {MARKER_COLUMNS}
            "#
        ))
        .bind(&marker_id)
        .bind(&req.recitation_id)
        .bind(author_id)
        .bind(req.timestamp)
        .bind(&req.label)
        .bind(&req.description)
        .bind(&req.category)
        .bind(&req.color)
        .fetch_one(pool)
        .await?;

        Ok(marker)
    }

    pub async fn find_by_id(pool: &PgPool, marker_id: &str) -> Result<Option<Self>, AppError> {
        let marker = sqlx::query_as::<_, Marker>(&format!(
            "SELECT {MARKER_COLUMNS} FROM markers WHERE marker_id = $1"
        ))
        .bind(marker_id)
        .fetch_optional(pool)
        .await?;

        Ok(marker)
    }

    pub async fn list_for_recitation(
        pool: &PgPool,
        recitation_id: &str,
    ) -> Result<Vec<Self>, AppError> {
        let markers = sqlx::query_as::<_, Marker>(&format!(
            r#"
            SELECT {MARKER_COLUMNS} FROM markers
            WHERE recitation_id = $1
            ORDER BY timestamp
            "#
        ))
        .bind(recitation_id)
        .fetch_all(pool)
        .await?;

        Ok(markers)
    }

    pub async fn update(
        pool: &PgPool,
        mut marker: Marker,
        req: UpdateMarkerRequest,
    ) -> Result<Self, AppError> {
        req.apply(&mut marker);

        let updated = sqlx::query_as::<_, Marker>(&format!(
            r#"
            UPDATE markers
            SET label = $2, description = $3, category = $4, color = $5, updated_at = NOW()
            WHERE marker_id = $1
            RETURNING {MARKER_COLUMNS}
            "#
        ))
        .bind(&marker.marker_id)
        .bind(&marker.label)
        .bind(&marker.description)
        .bind(&marker.category)
        .bind(&marker.color)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete(pool: &PgPool, marker_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM markers WHERE marker_id = $1")
            .bind(marker_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, gate, testing};

    fn marker() -> Marker {
        Marker {
            marker_id: "m1".into(),
            recitation_id: "r1".into(),
            author_id: "s1".into(),
            timestamp: 3.25,
            label: "idgham".into(),
            description: Some("Merge into the following noon".into()),
            category: Some("tajweed".into()),
            color: Some("#f59e0b".into()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn label_only_update_leaves_every_other_field_untouched() {
        let mut m = marker();
        let req: UpdateMarkerRequest = serde_json::from_str(r#"{"label":"ikhfa"}"#).unwrap();
        req.apply(&mut m);
        assert_eq!(m.label, "ikhfa");
        assert_eq!(m.description.as_deref(), Some("Merge into the following noon"));
        assert_eq!(m.category.as_deref(), Some("tajweed"));
        assert_eq!(m.color.as_deref(), Some("#f59e0b"));
    }

    #[test]
    fn author_edits_another_scholar_is_denied_admin_deletes() {
        let m = marker();
        // The authoring scholar may mutate it.
        assert!(gate::require_author_or_admin(&testing::user("s1", Role::Scholar), &m).is_ok());
        // A different scholar may not.
        assert!(matches!(
            gate::require_author_or_admin(&testing::user("s2", Role::Scholar), &m),
            Err(AppError::PermissionDenied)
        ));
        // An admin may.
        assert!(gate::require_author_or_admin(&testing::user("a1", Role::Admin), &m).is_ok());
    }

    #[test]
    fn create_request_defaults_category_and_color() {
        let req: CreateMarkerRequest = serde_json::from_str(
            r#"{"recitation_id":"r1","timestamp":1.0,"label":"pause"}"#,
        )
        .unwrap();
        assert_eq!(req.category.as_deref(), Some("general"));
        assert_eq!(req.color.as_deref(), Some("#f59e0b"));
    }
}
