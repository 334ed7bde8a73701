mod handler;
mod model;

pub use handler::{
    community_stats, create_community, get_community, join_community, leave_community,
    list_communities, my_communities, update_community,
};
pub use model::{Community, Membership, MembershipRole};
