use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::{Authored, Patch};
use crate::error::AppError;

/// A practice region a scholar marks for the reciter to loop over.
/// Invariant: `start_time < end_time`, on create and across every update.
#[derive(Debug, Serialize, FromRow)]
pub struct LoopRegion {
    pub region_id: String,
    pub recitation_id: String,
    pub author_id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub label: String,
    pub color: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Authored for LoopRegion {
    fn author_id(&self) -> Option<&str> {
        Some(&self.author_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLoopRegionRequest {
    pub recitation_id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub label: String,
    #[serde(default = "default_color")]
    pub color: Option<String>,
}

fn default_color() -> Option<String> {
    Some("#10b981".to_string())
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLoopRegionRequest {
    #[serde(default)]
    pub start_time: Patch<f64>,
    #[serde(default)]
    pub end_time: Patch<f64>,
    #[serde(default)]
    pub label: Patch<String>,
    #[serde(default)]
    pub color: Patch<Option<String>>,
    #[serde(default)]
    pub is_active: Patch<bool>,
}

fn check_bounds(start: f64, end: f64) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::Validation(
            "Loop region start_time must be before end_time".into(),
        ));
    }
    Ok(())
}

impl UpdateLoopRegionRequest {
    /// Resolves the effective bounds (supplied value where present, the
    /// persisted one otherwise) and validates them before anything is
    /// assigned. The update is all-or-nothing: a rejected change-set
    /// leaves the region exactly as it was.
    pub fn apply(self, region: &mut LoopRegion) -> Result<(), AppError> {
        if self.start_time.is_set() || self.end_time.is_set() {
            let start = self.start_time.resolve(region.start_time);
            let end = self.end_time.resolve(region.end_time);
            check_bounds(start, end)?;
            region.start_time = start;
            region.end_time = end;
        }
        self.label.apply_to(&mut region.label);
        self.color.apply_to(&mut region.color);
        self.is_active.apply_to(&mut region.is_active);
        Ok(())
    }
}

const REGION_COLUMNS: &str = "region_id, recitation_id, author_id, start_time, end_time, \
     label, color, is_active, created_at, updated_at";

impl LoopRegion {
    pub async fn create(
        pool: &PgPool,
        req: CreateLoopRegionRequest,
        author_id: &str,
    ) -> Result<Self, AppError> {
        check_bounds(req.start_time, req.end_time)?;

        let region_id = Uuid::new_v4().to_string();
        let region = sqlx::query_as::<_, LoopRegion>(&format!(
            r#"
            INSERT INTO loop_regions (region_id, recitation_id, author_id, start_time,
                                      end_time, label, color, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, false, NOW())
            RETURNING {REGION_COLUMNS}
            "#
        ))
        .bind(&region_id)
        .bind(&req.recitation_id)
        .bind(author_id)
        .bind(req.start_time)
        .bind(req.end_time)
        .bind(&req.label)
        .bind(&req.color)
        .fetch_one(pool)
        .await?;

        Ok(region)
    }

    pub async fn find_by_id(pool: &PgPool, region_id: &str) -> Result<Option<Self>, AppError> {
        let region = sqlx::query_as::<_, LoopRegion>(&format!(
            "SELECT {REGION_COLUMNS} FROM loop_regions WHERE region_id = $1"
        ))
        .bind(region_id)
        .fetch_optional(pool)
        .await?;

        Ok(region)
    }

    pub async fn list_for_recitation(
        pool: &PgPool,
        recitation_id: &str,
    ) -> Result<Vec<Self>, AppError> {
        let regions = sqlx::query_as::<_, LoopRegion>(&format!(
            r#"
            SELECT {REGION_COLUMNS} FROM loop_regions
            WHERE recitation_id = $1
            ORDER BY start_time
            "#
        ))
        .bind(recitation_id)
        .fetch_all(pool)
        .await?;

        Ok(regions)
    }

    pub async fn update(
        pool: &PgPool,
        mut region: LoopRegion,
        req: UpdateLoopRegionRequest,
    ) -> Result<Self, AppError> {
        req.apply(&mut region)?;

        let updated = sqlx::query_as::<_, LoopRegion>(&format!(
            r#"
            UPDATE loop_regions
            SET start_time = $2, end_time = $3, label = $4, color = $5,
                is_active = $6, updated_at = NOW()
            WHERE region_id = $1
            RETURNING {REGION_COLUMNS}
            "#
        ))
        .bind(&region.region_id)
        .bind(region.start_time)
        .bind(region.end_time)
        .bind(&region.label)
        .bind(&region.color)
        .bind(region.is_active)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete(pool: &PgPool, region_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM loop_regions WHERE region_id = $1")
            .bind(region_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> LoopRegion {
        LoopRegion {
            region_id: "lr1".into(),
            recitation_id: "r1".into(),
            author_id: "s1".into(),
            start_time: 10.0,
            end_time: 20.0,
            label: "verse 3".into(),
            color: Some("#10b981".into()),
            is_active: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn moving_one_bound_validates_against_the_persisted_other() {
        // end_time alone, crossing the persisted start: rejected.
        let mut r = region();
        let req: UpdateLoopRegionRequest = serde_json::from_str(r#"{"end_time":5.0}"#).unwrap();
        assert!(matches!(req.apply(&mut r), Err(AppError::Validation(_))));
        // Nothing was applied.
        assert_eq!(r.start_time, 10.0);
        assert_eq!(r.end_time, 20.0);

        // start_time alone, crossing the persisted end: rejected too.
        let req: UpdateLoopRegionRequest = serde_json::from_str(r#"{"start_time":25.0}"#).unwrap();
        assert!(req.apply(&mut r).is_err());
        assert_eq!(r.start_time, 10.0);
    }

    #[test]
    fn rejected_change_set_is_all_or_nothing() {
        let mut r = region();
        let req: UpdateLoopRegionRequest =
            serde_json::from_str(r#"{"end_time":5.0,"label":"new label"}"#).unwrap();
        assert!(req.apply(&mut r).is_err());
        // The label from the same change-set was not applied either.
        assert_eq!(r.label, "verse 3");
    }

    #[test]
    fn valid_partial_bound_update_applies() {
        let mut r = region();
        let req: UpdateLoopRegionRequest = serde_json::from_str(r#"{"start_time":15.5}"#).unwrap();
        req.apply(&mut r).unwrap();
        assert_eq!(r.start_time, 15.5);
        assert_eq!(r.end_time, 20.0);
    }

    #[test]
    fn equal_bounds_are_rejected() {
        assert!(check_bounds(10.0, 10.0).is_err());
        assert!(check_bounds(10.0, 10.1).is_ok());
    }

    #[test]
    fn untouched_bounds_skip_validation() {
        // A label-only update on a region must not re-validate bounds.
        let mut r = region();
        let req: UpdateLoopRegionRequest =
            serde_json::from_str(r#"{"label":"slow practice"}"#).unwrap();
        req.apply(&mut r).unwrap();
        assert_eq!(r.label, "slow practice");
    }
}
