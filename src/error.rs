use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::utils::{error_codes, error_to_api_response};

/// Terminal request outcome. Every failure is reported synchronously to the
/// caller; there is no retry or background recovery path.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid bearer credential, or an inactive account.
    Unauthorized,
    /// The caller failed the authorization gate for the operation.
    PermissionDenied,
    /// The referenced entity does not exist. Checked before any gate.
    NotFound(&'static str),
    /// A domain invariant was violated by the request payload.
    Validation(String),
    AlreadyMember,
    NotMember,
    UserExists,
    Database(sqlx::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl AppError {
    fn code_and_status(&self) -> (i32, StatusCode, String) {
        match self {
            AppError::Unauthorized => (
                error_codes::AUTH_FAILED,
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::PermissionDenied => (
                error_codes::PERMISSION_DENIED,
                StatusCode::FORBIDDEN,
                "Not enough permissions".to_string(),
            ),
            AppError::NotFound(what) => (
                error_codes::NOT_FOUND,
                StatusCode::NOT_FOUND,
                format!("{} not found", what),
            ),
            AppError::Validation(msg) => (
                error_codes::VALIDATION_ERROR,
                StatusCode::BAD_REQUEST,
                msg.clone(),
            ),
            AppError::AlreadyMember => (
                error_codes::ALREADY_MEMBER,
                StatusCode::BAD_REQUEST,
                "Already a member of this community".to_string(),
            ),
            AppError::NotMember => (
                error_codes::NOT_MEMBER,
                StatusCode::NOT_FOUND,
                "Not a member of this community".to_string(),
            ),
            AppError::UserExists => (
                error_codes::USER_EXISTS,
                StatusCode::CONFLICT,
                "User already exists".to_string(),
            ),
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    error_codes::INTERNAL_ERROR,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, status, msg) = self.code_and_status();
        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_boundary_contract() {
        assert_eq!(
            AppError::NotFound("Recitation").code_and_status().1,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::PermissionDenied.code_and_status().1,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Validation("bad".into()).code_and_status().1,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AlreadyMember.code_and_status().1,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotMember.code_and_status().1,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized.code_and_status().1,
            StatusCode::UNAUTHORIZED
        );
    }
}
