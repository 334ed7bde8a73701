mod handler;
mod model;

pub use handler::{get_user, list_users, login, me, register, update_user};
pub use model::{UpdateUserRequest, User};
