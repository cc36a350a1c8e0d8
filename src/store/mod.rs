//! Persistence seams
//!
//! Services depend on these traits only. [`memory`] backs dev mode and
//! tests; [`mongo`] backs production.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Campaign, Influencer, Submission, VerificationRecord, VideoStats};
use crate::types::Result;

pub use memory::{InMemoryCampaignStore, InMemoryInfluencerStore, InMemorySubmissionStore};
pub use mongo::{MongoCampaignStore, MongoInfluencerStore, MongoSubmissionStore};

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Insert a new campaign. Fails with a validation error on a duplicate id.
    async fn insert(&self, campaign: &Campaign) -> Result<()>;

    async fn get(&self, campaign_id: u64) -> Result<Option<Campaign>>;

    /// All campaigns, newest first
    async fn list(&self) -> Result<Vec<Campaign>>;
}

#[async_trait]
pub trait InfluencerStore: Send + Sync {
    async fn get_by_wallet(&self, wallet_address: &str) -> Result<Option<Influencer>>;

    async fn get_by_id(&self, influencer_id: &str) -> Result<Option<Influencer>>;

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Influencer>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Influencer>>;

    /// Insert or replace by wallet. Fails with a validation error when the
    /// channel id or email already belongs to another influencer.
    async fn save(&self, influencer: &Influencer) -> Result<()>;

    /// Liveness probe for the health endpoint
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new submission. Fails with `AlreadySubmitted` when the
    /// (campaign, influencer) pair already has one.
    async fn insert(&self, submission: &Submission) -> Result<()>;

    /// Overwrite the stored record with the same id, only while its
    /// verification status is rejected or error. Returns `false` when the
    /// condition no longer holds.
    async fn replace_if_resubmittable(&self, submission: &Submission) -> Result<bool>;

    async fn find_by_pair(&self, campaign_id: u64, influencer_id: &str)
        -> Result<Option<Submission>>;

    async fn get(&self, submission_id: &str) -> Result<Option<Submission>>;

    /// Submissions of a campaign, newest first
    async fn list_for_campaign(&self, campaign_id: u64) -> Result<Vec<Submission>>;

    /// Submissions of a campaign in rank order
    async fn ranked_for_campaign(
        &self,
        campaign_id: u64,
        limit: Option<usize>,
    ) -> Result<Vec<Submission>>;

    /// Distinct video ids whose metrics were last refreshed before `before`
    async fn stale_video_ids(&self, before: DateTime<Utc>) -> Result<Vec<String>>;

    /// Apply fresh metrics to every submission referencing `video_id`
    async fn update_metrics_for_video(
        &self,
        video_id: &str,
        stats: VideoStats,
        duration_seconds: u64,
        performance_score: f64,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    /// Write a verdict while the submission is still pending for
    /// `video_id`. Returns `false` when the write was discarded.
    async fn complete_verification(
        &self,
        submission_id: &str,
        video_id: &str,
        record: &VerificationRecord,
    ) -> Result<bool>;

    /// Put the verification back to pending. Approved verdicts are final:
    /// returns `None` when the submission is missing or already approved.
    async fn reset_verification(
        &self,
        submission_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Submission>>;

    /// Pending submissions whose verification was requested before `before`
    async fn pending_verifications(&self, before: DateTime<Utc>) -> Result<Vec<Submission>>;
}
