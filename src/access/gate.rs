//! The four canonical authorization gates. Each endpoint checks exactly one
//! of these after confirming the target resource exists; an absent resource
//! is a NotFound before any gate runs, so existence and permission failures
//! are never conflated.

use super::{Authored, AuthUser, Owned, authored, owns};
use crate::error::AppError;

/// Read-if-owner-or-privileged: owners see their own resources, scholars
/// and admins see everything under review.
pub fn can_read(user: &AuthUser, resource: &impl Owned) -> bool {
    owns(user, resource) || user.role.is_privileged()
}

/// Write-if-author-or-admin: annotations are edited by the scholar who
/// wrote them, or an admin.
pub fn can_edit_authored(user: &AuthUser, resource: &impl Authored) -> bool {
    authored(user, resource) || user.role.is_admin()
}

pub fn require_read(user: &AuthUser, resource: &impl Owned) -> Result<(), AppError> {
    if can_read(user, resource) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

/// Write-if-privileged-only.
pub fn require_reviewer(user: &AuthUser) -> Result<(), AppError> {
    if user.role.is_privileged() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

/// Write-if-owner-only.
pub fn require_owner(user: &AuthUser, resource: &impl Owned) -> Result<(), AppError> {
    if owns(user, resource) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

pub fn require_author_or_admin(
    user: &AuthUser,
    resource: &impl Authored,
) -> Result<(), AppError> {
    if can_edit_authored(user, resource) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, testing};

    struct Annotation {
        owner: &'static str,
        author: &'static str,
    }

    impl Owned for Annotation {
        fn owner_id(&self) -> Option<&str> {
            Some(self.owner)
        }
    }

    impl Authored for Annotation {
        fn author_id(&self) -> Option<&str> {
            Some(self.author)
        }
    }

    const RESOURCE: Annotation = Annotation {
        owner: "u1",
        author: "s1",
    };

    #[test]
    fn read_gate_equals_owns_or_privileged() {
        // Exhaustive over role x ownership.
        for (id, is_owner) in [("u1", true), ("u2", false)] {
            for role in [Role::User, Role::Scholar, Role::Admin] {
                let user = testing::user(id, role);
                assert_eq!(
                    can_read(&user, &RESOURCE),
                    owns(&user, &RESOURCE) || role.is_privileged(),
                    "mismatch for id={} role={:?}",
                    id,
                    role
                );
                assert_eq!(is_owner, owns(&user, &RESOURCE));
            }
        }
    }

    #[test]
    fn owner_reads_without_privilege() {
        assert!(require_read(&testing::user("u1", Role::User), &RESOURCE).is_ok());
    }

    #[test]
    fn stranger_is_denied_read() {
        assert!(matches!(
            require_read(&testing::user("u2", Role::User), &RESOURCE),
            Err(AppError::PermissionDenied)
        ));
    }

    #[test]
    fn reviewer_gate_rejects_plain_users() {
        assert!(require_reviewer(&testing::user("u1", Role::User)).is_err());
        assert!(require_reviewer(&testing::user("s1", Role::Scholar)).is_ok());
        assert!(require_reviewer(&testing::user("a1", Role::Admin)).is_ok());
    }

    #[test]
    fn admin_gate_rejects_scholars() {
        assert!(require_admin(&testing::user("s1", Role::Scholar)).is_err());
        assert!(require_admin(&testing::user("a1", Role::Admin)).is_ok());
    }

    #[test]
    fn owner_gate_ignores_privilege() {
        assert!(require_owner(&testing::user("u1", Role::User), &RESOURCE).is_ok());
        // A scholar who does not own the resource is still denied.
        assert!(require_owner(&testing::user("s1", Role::Scholar), &RESOURCE).is_err());
    }

    #[test]
    fn author_gate_admits_author_and_admin_only() {
        assert!(require_author_or_admin(&testing::user("s1", Role::Scholar), &RESOURCE).is_ok());
        assert!(require_author_or_admin(&testing::user("a1", Role::Admin), &RESOURCE).is_ok());
        // Another scholar cannot touch someone else's annotation.
        assert!(
            require_author_or_admin(&testing::user("s2", Role::Scholar), &RESOURCE).is_err()
        );
        // Nor can the recitation owner.
        assert!(require_author_or_admin(&testing::user("u1", Role::User), &RESOURCE).is_err());
    }
}
