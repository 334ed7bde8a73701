//! Access-control core: the resolved request identity, the role model,
//! ownership/authorship resolution and the authorization gates.
//!
//! Everything here is pure and synchronous. Handlers pass the resolved
//! [`AuthUser`] and the loaded entity in explicitly; nothing reads ambient
//! state or touches the database.

pub mod gate;
pub mod ownership;
pub mod patch;
pub mod role;

pub use ownership::{Authored, Owned, authored, owns};
pub use patch::Patch;
pub use role::Role;

/// The authenticated caller, resolved by the auth middleware before any
/// handler runs. Role is read-only for the lifetime of the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{AuthUser, Role};

    pub fn user(id: &str, role: Role) -> AuthUser {
        AuthUser {
            user_id: id.to_string(),
            role,
        }
    }
}
