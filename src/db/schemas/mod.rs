//! Database schemas
//!
//! MongoDB document structures for campaigns, influencers and submissions.

mod campaign;
mod influencer;
mod metadata;
mod submission;

pub use campaign::{CampaignDoc, CAMPAIGN_COLLECTION};
pub use influencer::{InfluencerDoc, INFLUENCER_COLLECTION};
pub use metadata::Metadata;
pub use submission::{metrics_set, SubmissionDoc, VerificationDoc, SUBMISSION_COLLECTION};
