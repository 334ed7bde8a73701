mod handler;
mod model;

pub use handler::{
    create_recitation, get_recitation, list_pending, list_recitations, update_recitation,
};
pub use model::{Recitation, RecitationStatus};
