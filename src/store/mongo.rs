//! MongoDB-backed stores

use async_trait::async_trait;
use bson::{doc, Bson, DateTime};
use chrono::Utc;
use tracing::debug;

use super::{CampaignStore, InfluencerStore, SubmissionStore};
use crate::db::schemas::{
    metrics_set, CampaignDoc, InfluencerDoc, SubmissionDoc, VerificationDoc, CAMPAIGN_COLLECTION,
    INFLUENCER_COLLECTION, SUBMISSION_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::models::{
    Campaign, Influencer, Submission, VerificationRecord, VerificationStatus, VideoStats,
};
use crate::types::{EngineError, Result};

fn bson_time(t: chrono::DateTime<Utc>) -> DateTime {
    DateTime::from_chrono(t)
}

// ============================================================================
// Campaigns
// ============================================================================

pub struct MongoCampaignStore {
    collection: MongoCollection<CampaignDoc>,
}

impl MongoCampaignStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(CAMPAIGN_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    async fn insert(&self, campaign: &Campaign) -> Result<()> {
        if self.collection.insert_one(CampaignDoc::from(campaign)).await? {
            Ok(())
        } else {
            Err(EngineError::Validation(format!(
                "campaign {} already exists",
                campaign.campaign_id
            )))
        }
    }

    async fn get(&self, campaign_id: u64) -> Result<Option<Campaign>> {
        Ok(self
            .collection
            .find_one(doc! { "campaign_id": campaign_id as i64 })
            .await?
            .map(Campaign::from))
    }

    async fn list(&self) -> Result<Vec<Campaign>> {
        Ok(self
            .collection
            .find_many(doc! {}, Some(doc! { "created_at": -1 }), None)
            .await?
            .into_iter()
            .map(Campaign::from)
            .collect())
    }
}

// ============================================================================
// Influencers
// ============================================================================

pub struct MongoInfluencerStore {
    client: MongoClient,
    collection: MongoCollection<InfluencerDoc>,
}

impl MongoInfluencerStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            client: client.clone(),
            collection: client.collection(INFLUENCER_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl InfluencerStore for MongoInfluencerStore {
    async fn get_by_wallet(&self, wallet_address: &str) -> Result<Option<Influencer>> {
        Ok(self
            .collection
            .find_one(doc! { "wallet_address": wallet_address })
            .await?
            .map(Influencer::from))
    }

    async fn get_by_id(&self, influencer_id: &str) -> Result<Option<Influencer>> {
        Ok(self
            .collection
            .find_one(doc! { "influencer_id": influencer_id })
            .await?
            .map(Influencer::from))
    }

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Influencer>> {
        Ok(self
            .collection
            .find_one(doc! { "channel_id": channel_id })
            .await?
            .map(Influencer::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Influencer>> {
        Ok(self
            .collection
            .find_one(doc! { "email": email })
            .await?
            .map(Influencer::from))
    }

    async fn save(&self, influencer: &Influencer) -> Result<()> {
        let saved = self
            .collection
            .upsert_one(
                doc! { "wallet_address": influencer.wallet_address.as_str() },
                InfluencerDoc::from(influencer),
            )
            .await?;
        if saved {
            Ok(())
        } else {
            Err(EngineError::Validation(
                "channel id or email is already registered to another influencer".into(),
            ))
        }
    }

    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }
}

// ============================================================================
// Submissions
// ============================================================================

pub struct MongoSubmissionStore {
    collection: MongoCollection<SubmissionDoc>,
}

impl MongoSubmissionStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(SUBMISSION_COLLECTION).await?,
        })
    }

    fn resubmittable_statuses() -> Bson {
        Bson::Array(vec![
            VerificationStatus::Rejected.as_str().into(),
            VerificationStatus::Error.as_str().into(),
        ])
    }
}

#[async_trait]
impl SubmissionStore for MongoSubmissionStore {
    async fn insert(&self, submission: &Submission) -> Result<()> {
        if self
            .collection
            .insert_one(SubmissionDoc::from(submission))
            .await?
        {
            return Ok(());
        }

        // Unique (campaign, influencer) index rejected the insert
        let existing = self
            .find_by_pair(submission.campaign_id, &submission.influencer_id)
            .await?
            .map(|s| s.submission_id)
            .unwrap_or_default();
        Err(EngineError::AlreadySubmitted {
            submission_id: existing,
        })
    }

    async fn replace_if_resubmittable(&self, submission: &Submission) -> Result<bool> {
        let filter = doc! {
            "submission_id": submission.submission_id.as_str(),
            "verification.status": { "$in": Self::resubmittable_statuses() },
        };
        let mut replacement = SubmissionDoc::from(submission);
        replacement.metadata.created_at = Some(bson_time(submission.created_at));

        match self.collection.replace_one(filter, replacement).await? {
            Some(result) => Ok(result.matched_count == 1),
            None => Ok(false),
        }
    }

    async fn find_by_pair(
        &self,
        campaign_id: u64,
        influencer_id: &str,
    ) -> Result<Option<Submission>> {
        Ok(self
            .collection
            .find_one(doc! {
                "campaign_id": campaign_id as i64,
                "influencer_id": influencer_id,
            })
            .await?
            .map(Submission::from))
    }

    async fn get(&self, submission_id: &str) -> Result<Option<Submission>> {
        Ok(self
            .collection
            .find_one(doc! { "submission_id": submission_id })
            .await?
            .map(Submission::from))
    }

    async fn list_for_campaign(&self, campaign_id: u64) -> Result<Vec<Submission>> {
        Ok(self
            .collection
            .find_many(
                doc! { "campaign_id": campaign_id as i64 },
                Some(doc! { "created_at": -1 }),
                None,
            )
            .await?
            .into_iter()
            .map(Submission::from)
            .collect())
    }

    async fn ranked_for_campaign(
        &self,
        campaign_id: u64,
        limit: Option<usize>,
    ) -> Result<Vec<Submission>> {
        Ok(self
            .collection
            .find_many(
                doc! { "campaign_id": campaign_id as i64 },
                Some(doc! { "performance_score": -1, "created_at": 1, "submission_id": 1 }),
                limit.map(|l| l as i64),
            )
            .await?
            .into_iter()
            .map(Submission::from)
            .collect())
    }

    async fn stale_video_ids(&self, before: chrono::DateTime<Utc>) -> Result<Vec<String>> {
        let values = self
            .collection
            .distinct(
                "video_id",
                doc! { "last_analytics_update": { "$lt": bson_time(before) } },
            )
            .await?;
        Ok(values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    async fn update_metrics_for_video(
        &self,
        video_id: &str,
        stats: VideoStats,
        duration_seconds: u64,
        performance_score: f64,
        now: chrono::DateTime<Utc>,
    ) -> Result<u64> {
        let result = self
            .collection
            .update_many(
                doc! { "video_id": video_id },
                doc! { "$set": metrics_set(stats, duration_seconds, performance_score, bson_time(now)) },
            )
            .await?;
        debug!(video_id, modified = result.modified_count, "Metrics applied");
        Ok(result.modified_count)
    }

    async fn complete_verification(
        &self,
        submission_id: &str,
        video_id: &str,
        record: &VerificationRecord,
    ) -> Result<bool> {
        let mut set = VerificationDoc::from(record).to_verdict_set();
        if let Some(at) = record.verified_at {
            set.insert("updated_at", bson_time(at));
            set.insert("metadata.updated_at", bson_time(at));
        }

        let result = self
            .collection
            .update_one(
                doc! {
                    "submission_id": submission_id,
                    "video_id": video_id,
                    "verification.status": VerificationStatus::Pending.as_str(),
                },
                doc! { "$set": set },
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn reset_verification(
        &self,
        submission_id: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<Option<Submission>> {
        let pending = VerificationDoc::from(&VerificationRecord::pending(now));
        let pending = bson::to_bson(&pending)
            .map_err(|e| EngineError::Internal(format!("encode verification: {}", e)))?;

        Ok(self
            .collection
            .find_one_and_update(
                doc! {
                    "submission_id": submission_id,
                    "verification.status": { "$ne": VerificationStatus::Approved.as_str() },
                },
                doc! { "$set": {
                    "verification": pending,
                    "updated_at": bson_time(now),
                    "metadata.updated_at": bson_time(now),
                }},
            )
            .await?
            .map(Submission::from))
    }

    async fn pending_verifications(
        &self,
        before: chrono::DateTime<Utc>,
    ) -> Result<Vec<Submission>> {
        Ok(self
            .collection
            .find_many(
                doc! {
                    "verification.status": VerificationStatus::Pending.as_str(),
                    "$or": [
                        { "verification.requested_at": { "$lt": bson_time(before) } },
                        { "verification.requested_at": Bson::Null },
                    ],
                },
                Some(doc! { "verification.requested_at": 1 }),
                None,
            )
            .await?
            .into_iter()
            .map(Submission::from)
            .collect())
    }
}
