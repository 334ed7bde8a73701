mod handler;
mod model;

pub use handler::{create_loop_region, delete_loop_region, list_loop_regions, update_loop_region};
pub use model::LoopRegion;
