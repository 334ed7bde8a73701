use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::{Patch, Role};
use crate::error::AppError;
use crate::utils::hash_password;

#[derive(Debug, Serialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Patch<String>,
    #[serde(default)]
    pub username: Patch<String>,
    #[serde(default)]
    pub full_name: Patch<Option<String>>,
    #[serde(default)]
    pub role: Patch<Role>,
    #[serde(default)]
    pub is_active: Patch<bool>,
}

impl UpdateUserRequest {
    /// Assigns only the supplied fields; everything else keeps its
    /// persisted value.
    pub fn apply(self, user: &mut User) {
        self.email.apply_to(&mut user.email);
        self.username.apply_to(&mut user.username);
        self.full_name.apply_to(&mut user.full_name);
        self.role.apply_to(&mut user.role);
        self.is_active.apply_to(&mut user.is_active);
    }
}

const USER_COLUMNS: &str = "user_id, email, username, password_hash, full_name, \
     role, is_active, is_verified, created_at, updated_at";

impl User {
    pub async fn create(pool: &PgPool, req: RegisterRequest) -> Result<Self, AppError> {
        let user_id = Uuid::new_v4().to_string();
        let password_hash = hash_password(&req.password)
            .map_err(|e| AppError::Validation(format!("Failed to hash password: {}", e)))?;

        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_id, email, username, password_hash, full_name,
                               role, is_active, is_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, 'user', true, false, NOW())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user_id)
        .bind(&req.email)
        .bind(&req.username)
        .bind(&password_hash)
        .bind(&req.full_name)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::UserExists,
            _ => AppError::Database(e),
        })
    }

    pub async fn find_by_id(pool: &PgPool, user_id: &str) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn list(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Self>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Partial update through the change-set engine; absent fields are left
    /// untouched.
    pub async fn update(
        pool: &PgPool,
        user_id: &str,
        req: UpdateUserRequest,
    ) -> Result<Self, AppError> {
        let mut user = Self::find_by_id(pool, user_id)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        req.apply(&mut user);

        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = $2, username = $3, full_name = $4, role = $5,
                is_active = $6, updated_at = NOW()
            WHERE user_id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.user_id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.is_active)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }

    pub async fn verify_login(&self, password: &str) -> Result<bool, AppError> {
        crate::utils::verify_password(password, &self.password_hash)
            .map_err(|e| AppError::Validation(format!("Password verification failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted_user() -> User {
        User {
            user_id: "u1".into(),
            email: "reciter@example.com".into(),
            username: "reciter".into(),
            password_hash: "hash".into(),
            full_name: Some("Reciter One".into()),
            role: Role::User,
            is_active: true,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let mut user = persisted_user();
        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"role":"scholar","is_active":false}"#).unwrap();
        req.apply(&mut user);

        assert_eq!(user.role, Role::Scholar);
        assert!(!user.is_active);
        // Absent fields keep their persisted values.
        assert_eq!(user.email, "reciter@example.com");
        assert_eq!(user.full_name.as_deref(), Some("Reciter One"));
    }

    #[test]
    fn explicit_null_clears_a_nullable_field() {
        let mut user = persisted_user();
        let req: UpdateUserRequest = serde_json::from_str(r#"{"full_name":null}"#).unwrap();
        req.apply(&mut user);
        assert_eq!(user.full_name, None);
    }
}
