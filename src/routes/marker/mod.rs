mod handler;
mod model;

pub use handler::{create_marker, delete_marker, list_markers, update_marker};
pub use model::Marker;
