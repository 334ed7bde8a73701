use serde::{Deserialize, Serialize};

/// Platform role. Distinct from the community-scoped membership role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Scholar,
    Admin,
}

impl Role {
    /// Scholars and admins may review recitations and author annotations.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Scholar | Role::Admin)
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scholar_and_admin_are_privileged() {
        assert!(!Role::User.is_privileged());
        assert!(Role::Scholar.is_privileged());
        assert!(Role::Admin.is_privileged());
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(!Role::User.is_admin());
        assert!(!Role::Scholar.is_admin());
        assert!(Role::Admin.is_admin());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Scholar).unwrap(), "\"scholar\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"admin\"").unwrap(),
            Role::Admin
        );
    }
}
