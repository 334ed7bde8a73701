mod handler;
mod model;

pub use handler::{
    create_feedback, delete_feedback, feedback_stats, get_feedback, list_feedback,
    update_feedback,
};
pub use model::{Feedback, FeedbackStatus};
