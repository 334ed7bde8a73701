use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::{AuthUser, Owned, Patch, owns};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "feedback_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    BugReport,
    FeatureRequest,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "feedback_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FeedbackPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "feedback_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Feedback {
    pub feedback_id: String,
    /// Nullable: feedback may be submitted anonymously.
    pub user_id: Option<String>,
    pub category: FeedbackCategory,
    pub title: String,
    pub description: String,
    pub priority: FeedbackPriority,
    pub status: FeedbackStatus,
    pub contact_email: Option<String>,
    pub contact_name: Option<String>,
    pub browser_info: Option<String>,
    pub device_info: Option<String>,
    pub admin_response: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Owned for Feedback {
    fn owner_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    pub category: FeedbackCategory,
    pub title: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: FeedbackPriority,
    pub contact_email: Option<String>,
    pub contact_name: Option<String>,
    pub browser_info: Option<String>,
    pub device_info: Option<String>,
}

fn default_priority() -> FeedbackPriority {
    FeedbackPriority::Medium
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFeedbackRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub status: Patch<FeedbackStatus>,
    #[serde(default)]
    pub priority: Patch<FeedbackPriority>,
    #[serde(default)]
    pub admin_response: Patch<Option<String>>,
}

impl UpdateFeedbackRequest {
    /// Authorizes and narrows the change-set for the given actor.
    ///
    /// Admins update anything. The owner may edit title and description,
    /// and only while the feedback is still open; any other supplied
    /// field is dropped rather than applied. Closed feedback is immutable
    /// to its owner, and everyone else is denied outright.
    pub fn authorize(self, user: &AuthUser, feedback: &Feedback) -> Result<Self, AppError> {
        if user.role.is_admin() {
            return Ok(self);
        }
        if !owns(user, feedback) {
            return Err(AppError::PermissionDenied);
        }
        if feedback.status != FeedbackStatus::Open {
            return Err(AppError::PermissionDenied);
        }
        Ok(Self {
            title: self.title,
            description: self.description,
            ..Self::default()
        })
    }

    pub fn apply(self, feedback: &mut Feedback) {
        self.title.apply_to(&mut feedback.title);
        self.description.apply_to(&mut feedback.description);
        self.status.apply_to(&mut feedback.status);
        self.priority.apply_to(&mut feedback.priority);
        self.admin_response.apply_to(&mut feedback.admin_response);
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackFilter {
    pub category: Option<FeedbackCategory>,
    pub priority: Option<FeedbackPriority>,
    pub status: Option<FeedbackStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackSummary {
    pub total_feedback: i64,
    pub open_feedback: i64,
    pub in_progress_feedback: i64,
    pub resolved_feedback: i64,
    pub bug_reports: i64,
    pub feature_requests: i64,
    pub general_feedback: i64,
    pub high_priority: i64,
}

const FEEDBACK_COLUMNS: &str = "feedback_id, user_id, category, title, description, priority, \
     status, contact_email, contact_name, browser_info, device_info, admin_response, \
     resolved_by, resolved_at, created_at, updated_at";

impl Feedback {
    pub async fn create(
        pool: &PgPool,
        req: CreateFeedbackRequest,
        user_id: Option<&str>,
    ) -> Result<Self, AppError> {
        let feedback_id = Uuid::new_v4().to_string();
        let feedback = sqlx::query_as::<_, Feedback>(&format!(
            r#"
            INSERT INTO user_feedback (feedback_id, user_id, category, title, description,
                                       priority, status, contact_email, contact_name,
                                       browser_info, device_info, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'open', $7, $8, $9, $10, NOW())
            RETURNING {FEEDBACK_COLUMNS}
            "#
        ))
        .bind(&feedback_id)
        .bind(user_id)
        .bind(req.category)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.priority)
        .bind(&req.contact_email)
        .bind(&req.contact_name)
        .bind(&req.browser_info)
        .bind(&req.device_info)
        .fetch_one(pool)
        .await?;

        Ok(feedback)
    }

    pub async fn find_by_id(pool: &PgPool, feedback_id: &str) -> Result<Option<Self>, AppError> {
        let feedback = sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM user_feedback WHERE feedback_id = $1"
        ))
        .bind(feedback_id)
        .fetch_optional(pool)
        .await?;

        Ok(feedback)
    }

    /// Admin view over all feedback; `owner` narrows to one user's rows
    /// for everyone else.
    pub async fn list(
        pool: &PgPool,
        owner: Option<&str>,
        filter: &FeedbackFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, AppError> {
        let pattern = filter.search.as_ref().map(|s| format!("%{}%", s));
        let feedback = sqlx::query_as::<_, Feedback>(&format!(
            r#"
            SELECT {FEEDBACK_COLUMNS} FROM user_feedback
            WHERE ($1::TEXT IS NULL OR user_id = $1)
              AND ($2::feedback_category IS NULL OR category = $2)
              AND ($3::feedback_priority IS NULL OR priority = $3)
              AND ($4::feedback_status IS NULL OR status = $4)
              AND ($5::TEXT IS NULL OR title ILIKE $5 OR description ILIKE $5)
            ORDER BY created_at DESC
            OFFSET $6 LIMIT $7
            "#
        ))
        .bind(owner)
        .bind(filter.category)
        .bind(filter.priority)
        .bind(filter.status)
        .bind(pattern)
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(feedback)
    }

    /// Applies an already-authorized change-set. An admin response stamps
    /// the resolver.
    pub async fn update(
        pool: &PgPool,
        mut feedback: Feedback,
        req: UpdateFeedbackRequest,
        actor: &AuthUser,
    ) -> Result<Self, AppError> {
        let responded = req.admin_response.is_set() && actor.role.is_admin();
        req.apply(&mut feedback);
        if responded {
            feedback.resolved_by = Some(actor.user_id.clone());
        }

        let updated = sqlx::query_as::<_, Feedback>(&format!(
            r#"
            UPDATE user_feedback
            SET title = $2, description = $3, status = $4, priority = $5,
                admin_response = $6, resolved_by = $7,
                resolved_at = CASE WHEN $8 THEN NOW() ELSE resolved_at END,
                updated_at = NOW()
            WHERE feedback_id = $1
            RETURNING {FEEDBACK_COLUMNS}
            "#
        ))
        .bind(&feedback.feedback_id)
        .bind(&feedback.title)
        .bind(&feedback.description)
        .bind(feedback.status)
        .bind(feedback.priority)
        .bind(&feedback.admin_response)
        .bind(&feedback.resolved_by)
        .bind(responded)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete(pool: &PgPool, feedback_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_feedback WHERE feedback_id = $1")
            .bind(feedback_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn summary(pool: &PgPool) -> Result<FeedbackSummary, AppError> {
        let row: (i64, i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'open'),
                   COUNT(*) FILTER (WHERE status = 'in_progress'),
                   COUNT(*) FILTER (WHERE status = 'resolved'),
                   COUNT(*) FILTER (WHERE category = 'bug_report'),
                   COUNT(*) FILTER (WHERE category = 'feature_request'),
                   COUNT(*) FILTER (WHERE category = 'general'),
                   COUNT(*) FILTER (WHERE priority = 'high')
            FROM user_feedback
            "#,
        )
        .fetch_one(pool)
        .await?;

        Ok(FeedbackSummary {
            total_feedback: row.0,
            open_feedback: row.1,
            in_progress_feedback: row.2,
            resolved_feedback: row.3,
            bug_reports: row.4,
            feature_requests: row.5,
            general_feedback: row.6,
            high_priority: row.7,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, testing};

    fn feedback(status: FeedbackStatus, owner: Option<&str>) -> Feedback {
        Feedback {
            feedback_id: "f1".into(),
            user_id: owner.map(String::from),
            category: FeedbackCategory::BugReport,
            title: "Waveform cuts off".into(),
            description: "The last ayah is not rendered".into(),
            priority: FeedbackPriority::Medium,
            status,
            contact_email: None,
            contact_name: None,
            browser_info: None,
            device_info: None,
            admin_response: None,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn title_patch() -> UpdateFeedbackRequest {
        serde_json::from_str(r#"{"title":"Waveform truncated"}"#).unwrap()
    }

    #[test]
    fn closed_feedback_is_immutable_to_its_owner() {
        let f = feedback(FeedbackStatus::Closed, Some("u1"));
        let result = title_patch().authorize(&testing::user("u1", Role::User), &f);
        assert!(matches!(result, Err(AppError::PermissionDenied)));
    }

    #[test]
    fn admin_edits_closed_feedback() {
        let f = feedback(FeedbackStatus::Closed, Some("u1"));
        assert!(title_patch()
            .authorize(&testing::user("a1", Role::Admin), &f)
            .is_ok());
    }

    #[test]
    fn owner_edit_on_open_feedback_is_narrowed_to_title_and_description() {
        let f = feedback(FeedbackStatus::Open, Some("u1"));
        let req: UpdateFeedbackRequest = serde_json::from_str(
            r#"{"title":"New title","status":"resolved","priority":"critical"}"#,
        )
        .unwrap();
        let narrowed = req.authorize(&testing::user("u1", Role::User), &f).unwrap();
        assert!(narrowed.title.is_set());
        // Disallowed fields were dropped, not applied.
        assert!(!narrowed.status.is_set());
        assert!(!narrowed.priority.is_set());
    }

    #[test]
    fn strangers_are_denied() {
        let f = feedback(FeedbackStatus::Open, Some("u1"));
        assert!(matches!(
            title_patch().authorize(&testing::user("u2", Role::User), &f),
            Err(AppError::PermissionDenied)
        ));
        // Scholars hold no special power over feedback.
        assert!(matches!(
            title_patch().authorize(&testing::user("s1", Role::Scholar), &f),
            Err(AppError::PermissionDenied)
        ));
    }

    #[test]
    fn anonymous_feedback_is_admin_only() {
        let f = feedback(FeedbackStatus::Open, None);
        assert!(matches!(
            title_patch().authorize(&testing::user("u1", Role::User), &f),
            Err(AppError::PermissionDenied)
        ));
        assert!(title_patch()
            .authorize(&testing::user("a1", Role::Admin), &f)
            .is_ok());
    }
}
