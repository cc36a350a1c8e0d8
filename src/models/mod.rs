//! Domain models shared by services, stores and routes

pub mod campaign;
pub mod influencer;
pub mod submission;

pub use campaign::{Campaign, NewCampaign, VerificationConfig, MAX_WORD_COUNT, MIN_WORD_COUNT};
pub use influencer::{normalize_wallet, ChannelVerificationMethod, Influencer, ProfileUpdate};
pub use submission::{
    rank_order, RequirementsChecklist, Submission, SubmissionContent, VerificationErrorCode,
    VerificationRecord, VerificationStatus, VideoStats,
};
