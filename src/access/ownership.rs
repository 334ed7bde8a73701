use super::AuthUser;

/// A resource with a direct owner reference. The owner relation varies per
/// entity: a recitation is owned by the user who recorded it, a comment by
/// the recitation owner it is about (its subject), a membership by the
/// member. Nullable references model anonymous submissions.
pub trait Owned {
    fn owner_id(&self) -> Option<&str>;
}

/// The authorship relation where it differs from ownership: who wrote a
/// scholar-generated annotation, as opposed to whose recitation it is
/// attached to.
pub trait Authored {
    fn author_id(&self) -> Option<&str>;
}

/// True iff `user` is the direct owner of `resource`. A missing owner
/// reference never matches any caller.
pub fn owns(user: &AuthUser, resource: &impl Owned) -> bool {
    resource.owner_id() == Some(user.user_id.as_str())
}

/// True iff `user` wrote `resource`. Fails closed like [`owns`].
pub fn authored(user: &AuthUser, resource: &impl Authored) -> bool {
    resource.author_id() == Some(user.user_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, testing};

    struct Fixture {
        owner: Option<String>,
        author: Option<String>,
    }

    impl Owned for Fixture {
        fn owner_id(&self) -> Option<&str> {
            self.owner.as_deref()
        }
    }

    impl Authored for Fixture {
        fn author_id(&self) -> Option<&str> {
            self.author.as_deref()
        }
    }

    #[test]
    fn owner_matches_only_the_referenced_user() {
        let r = Fixture {
            owner: Some("u1".into()),
            author: Some("s1".into()),
        };
        assert!(owns(&testing::user("u1", Role::User), &r));
        assert!(!owns(&testing::user("u2", Role::User), &r));
        assert!(!owns(&testing::user("s1", Role::Scholar), &r));
    }

    #[test]
    fn authorship_is_distinct_from_ownership() {
        let r = Fixture {
            owner: Some("u1".into()),
            author: Some("s1".into()),
        };
        assert!(authored(&testing::user("s1", Role::Scholar), &r));
        assert!(!authored(&testing::user("u1", Role::User), &r));
    }

    #[test]
    fn missing_reference_never_matches() {
        let r = Fixture {
            owner: None,
            author: None,
        };
        assert!(!owns(&testing::user("u1", Role::User), &r));
        assert!(!authored(&testing::user("u1", Role::Admin), &r));
    }
}
