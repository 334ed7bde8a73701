mod handler;
mod model;
mod payment;

pub use handler::{
    create_campaign, donation_stats, initiate_donation, list_campaigns, list_donations,
    list_public_donations, update_campaign, update_donation,
};
pub use model::{Campaign, Donation, DonationStatus};
