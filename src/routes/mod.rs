use serde::Deserialize;

pub mod comment;
pub mod community;
pub mod donation;
pub mod feedback;
pub mod health;
pub mod loop_region;
pub mod marker;
pub mod recitation;
pub mod user;

/// Shared offset/limit query parameters for listing endpoints.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 100)
    }
}
