use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::{Authored, Owned, Patch};
use crate::error::AppError;

/// A scholar's timestamped note on a recitation. Carries two distinct user
/// relations: `author_id` is the scholar who wrote it, `subject_id` the
/// recitation owner it is addressed to (denormalized at create time so
/// access checks need no join).
#[derive(Debug, Serialize, FromRow)]
pub struct Comment {
    pub comment_id: String,
    pub recitation_id: String,
    pub author_id: String,
    pub subject_id: String,
    pub timestamp: f64,
    pub text: Option<String>,
    pub audio_path: Option<String>,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Owned for Comment {
    fn owner_id(&self) -> Option<&str> {
        Some(&self.subject_id)
    }
}

impl Authored for Comment {
    fn author_id(&self) -> Option<&str> {
        Some(&self.author_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub recitation_id: String,
    pub timestamp: f64,
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommentRequest {
    #[serde(default)]
    pub text: Patch<Option<String>>,
    #[serde(default)]
    pub is_resolved: Patch<bool>,
}

impl UpdateCommentRequest {
    pub fn apply(self, comment: &mut Comment) {
        self.text.apply_to(&mut comment.text);
        self.is_resolved.apply_to(&mut comment.is_resolved);
    }
}

const COMMENT_COLUMNS: &str = "comment_id, recitation_id, author_id, subject_id, timestamp, \
     text, audio_path, is_resolved, created_at, updated_at";

impl Comment {
    pub async fn create(
        pool: &PgPool,
        req: CreateCommentRequest,
        author_id: &str,
        subject_id: &str,
    ) -> Result<Self, AppError> {
        let comment_id = Uuid::new_v4().to_string();
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (comment_id, recitation_id, author_id, subject_id,
                                  timestamp, text, is_resolved, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, NOW())
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(&comment_id)
        .bind(&req.recitation_id)
        .bind(author_id)
        .bind(subject_id)
        .bind(req.timestamp)
        .bind(&req.text)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    pub async fn find_by_id(pool: &PgPool, comment_id: &str) -> Result<Option<Self>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE comment_id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    pub async fn list_for_recitation(
        pool: &PgPool,
        recitation_id: &str,
    ) -> Result<Vec<Self>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE recitation_id = $1
            ORDER BY timestamp
            "#
        ))
        .bind(recitation_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Comments addressed to the given user (the subject relation).
    pub async fn list_for_subject(
        pool: &PgPool,
        subject_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE subject_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(subject_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    pub async fn update(
        pool: &PgPool,
        mut comment: Comment,
        req: UpdateCommentRequest,
    ) -> Result<Self, AppError> {
        req.apply(&mut comment);

        let updated = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET text = $2, is_resolved = $3, updated_at = NOW()
            WHERE comment_id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(&comment.comment_id)
        .bind(&comment.text)
        .bind(comment.is_resolved)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete(pool: &PgPool, comment_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM comments WHERE comment_id = $1")
            .bind(comment_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, authored, gate, owns, testing};

    fn comment() -> Comment {
        Comment {
            comment_id: "c1".into(),
            recitation_id: "r1".into(),
            author_id: "s1".into(),
            subject_id: "u1".into(),
            timestamp: 12.5,
            text: Some("Lengthen the madd here".into()),
            audio_path: None,
            is_resolved: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn owner_and_author_relations_are_distinct() {
        let c = comment();
        assert!(owns(&testing::user("u1", Role::User), &c));
        assert!(!owns(&testing::user("s1", Role::Scholar), &c));
        assert!(authored(&testing::user("s1", Role::Scholar), &c));
        assert!(!authored(&testing::user("u1", Role::User), &c));
    }

    #[test]
    fn resolution_toggle_is_denied_to_unrelated_actors() {
        let c = comment();
        // Neither author nor subject nor admin.
        let other_scholar = testing::user("s2", Role::Scholar);
        assert!(!gate::can_edit_authored(&other_scholar, &c) && !owns(&other_scholar, &c));
        let stranger = testing::user("u2", Role::User);
        assert!(!gate::can_edit_authored(&stranger, &c) && !owns(&stranger, &c));
        // Author, subject and admin may.
        assert!(gate::can_edit_authored(&testing::user("s1", Role::Scholar), &c));
        assert!(owns(&testing::user("u1", Role::User), &c));
        assert!(gate::can_edit_authored(&testing::user("a1", Role::Admin), &c));
    }

    #[test]
    fn resolving_leaves_text_untouched() {
        let mut c = comment();
        let req: UpdateCommentRequest = serde_json::from_str(r#"{"is_resolved":true}"#).unwrap();
        req.apply(&mut c);
        assert!(c.is_resolved);
        assert_eq!(c.text.as_deref(), Some("Lengthen the madd here"));
    }
}
