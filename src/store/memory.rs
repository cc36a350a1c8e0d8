//! In-memory stores for dev mode and tests

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{CampaignStore, InfluencerStore, SubmissionStore};
use crate::models::{
    rank_order, Campaign, Influencer, Submission, VerificationRecord, VerificationStatus,
    VideoStats,
};
use crate::types::{EngineError, Result};

// ============================================================================
// Campaigns
// ============================================================================

#[derive(Default)]
pub struct InMemoryCampaignStore {
    campaigns: Arc<RwLock<HashMap<u64, Campaign>>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn insert(&self, campaign: &Campaign) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        if campaigns.contains_key(&campaign.campaign_id) {
            return Err(EngineError::Validation(format!(
                "campaign {} already exists",
                campaign.campaign_id
            )));
        }
        campaigns.insert(campaign.campaign_id, campaign.clone());
        Ok(())
    }

    async fn get(&self, campaign_id: u64) -> Result<Option<Campaign>> {
        Ok(self.campaigns.read().await.get(&campaign_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Campaign>> {
        let mut all: Vec<Campaign> = self.campaigns.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

// ============================================================================
// Influencers
// ============================================================================

#[derive(Default)]
pub struct InMemoryInfluencerStore {
    /// Keyed by wallet address
    influencers: Arc<RwLock<HashMap<String, Influencer>>>,
}

impl InMemoryInfluencerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InfluencerStore for InMemoryInfluencerStore {
    async fn get_by_wallet(&self, wallet_address: &str) -> Result<Option<Influencer>> {
        Ok(self.influencers.read().await.get(wallet_address).cloned())
    }

    async fn get_by_id(&self, influencer_id: &str) -> Result<Option<Influencer>> {
        Ok(self
            .influencers
            .read()
            .await
            .values()
            .find(|i| i.influencer_id == influencer_id)
            .cloned())
    }

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Influencer>> {
        Ok(self
            .influencers
            .read()
            .await
            .values()
            .find(|i| i.channel_id.as_deref() == Some(channel_id))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Influencer>> {
        Ok(self
            .influencers
            .read()
            .await
            .values()
            .find(|i| i.email.as_deref() == Some(email))
            .cloned())
    }

    async fn save(&self, influencer: &Influencer) -> Result<()> {
        let mut influencers = self.influencers.write().await;

        let conflict = influencers.values().find(|other| {
            other.wallet_address != influencer.wallet_address
                && ((influencer.channel_id.is_some() && other.channel_id == influencer.channel_id)
                    || (influencer.email.is_some() && other.email == influencer.email))
        });
        if let Some(other) = conflict {
            let field = if influencer.channel_id.is_some() && other.channel_id == influencer.channel_id
            {
                "channel id"
            } else {
                "email"
            };
            return Err(EngineError::Validation(format!(
                "{} is already registered to another influencer",
                field
            )));
        }

        influencers.insert(influencer.wallet_address.clone(), influencer.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Submissions
// ============================================================================

#[derive(Default)]
pub struct InMemorySubmissionStore {
    /// Keyed by submission id
    submissions: Arc<RwLock<HashMap<String, Submission>>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn insert(&self, submission: &Submission) -> Result<()> {
        let mut submissions = self.submissions.write().await;
        if let Some(existing) = submissions.values().find(|s| {
            s.campaign_id == submission.campaign_id && s.influencer_id == submission.influencer_id
        }) {
            return Err(EngineError::AlreadySubmitted {
                submission_id: existing.submission_id.clone(),
            });
        }
        submissions.insert(submission.submission_id.clone(), submission.clone());
        Ok(())
    }

    async fn replace_if_resubmittable(&self, submission: &Submission) -> Result<bool> {
        let mut submissions = self.submissions.write().await;
        match submissions.get_mut(&submission.submission_id) {
            Some(current) if current.verification.status.is_resubmittable() => {
                *current = submission.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_pair(
        &self,
        campaign_id: u64,
        influencer_id: &str,
    ) -> Result<Option<Submission>> {
        Ok(self
            .submissions
            .read()
            .await
            .values()
            .find(|s| s.campaign_id == campaign_id && s.influencer_id == influencer_id)
            .cloned())
    }

    async fn get(&self, submission_id: &str) -> Result<Option<Submission>> {
        Ok(self.submissions.read().await.get(submission_id).cloned())
    }

    async fn list_for_campaign(&self, campaign_id: u64) -> Result<Vec<Submission>> {
        let mut list: Vec<Submission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.campaign_id == campaign_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn ranked_for_campaign(
        &self,
        campaign_id: u64,
        limit: Option<usize>,
    ) -> Result<Vec<Submission>> {
        let mut list: Vec<Submission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.campaign_id == campaign_id)
            .cloned()
            .collect();
        list.sort_by(rank_order);
        if let Some(limit) = limit {
            list.truncate(limit);
        }
        Ok(list)
    }

    async fn stale_video_ids(&self, before: DateTime<Utc>) -> Result<Vec<String>> {
        let ids: BTreeSet<String> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.last_analytics_update < before)
            .map(|s| s.video_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn update_metrics_for_video(
        &self,
        video_id: &str,
        stats: VideoStats,
        duration_seconds: u64,
        performance_score: f64,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut updated = 0;
        for s in self
            .submissions
            .write()
            .await
            .values_mut()
            .filter(|s| s.video_id == video_id)
        {
            s.stats = stats;
            s.duration_seconds = duration_seconds;
            s.performance_score = performance_score;
            s.last_analytics_update = now;
            s.updated_at = now;
            updated += 1;
        }
        Ok(updated)
    }

    async fn complete_verification(
        &self,
        submission_id: &str,
        video_id: &str,
        record: &VerificationRecord,
    ) -> Result<bool> {
        let mut submissions = self.submissions.write().await;
        match submissions.get_mut(submission_id) {
            Some(s)
                if s.video_id == video_id
                    && s.verification.status == VerificationStatus::Pending =>
            {
                let requested_at = s.verification.requested_at;
                s.verification = record.clone();
                s.verification.requested_at = requested_at;
                if let Some(at) = record.verified_at {
                    s.updated_at = at;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_verification(
        &self,
        submission_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Submission>> {
        let mut submissions = self.submissions.write().await;
        Ok(submissions
            .get_mut(submission_id)
            .filter(|s| s.verification.status != VerificationStatus::Approved)
            .map(|s| {
                s.verification = VerificationRecord::pending(now);
                s.updated_at = now;
                s.clone()
            }))
    }

    async fn pending_verifications(&self, before: DateTime<Utc>) -> Result<Vec<Submission>> {
        Ok(self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| {
                s.verification.status == VerificationStatus::Pending
                    && s.verification.requested_at.map_or(true, |at| at < before)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubmissionContent, VerificationErrorCode};
    use chrono::{Duration, TimeZone};

    fn content(video_id: &str, score: f64) -> SubmissionContent {
        SubmissionContent {
            video_id: video_id.into(),
            video_url: format!("https://youtu.be/{}", video_id),
            stats: VideoStats::default(),
            duration_seconds: 60,
            performance_score: score,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_one_submission_per_pair() {
        let store = InMemorySubmissionStore::new();
        let first = Submission::new(1, "inf", content("aaaaaaaaaaa", 1.0), t0());
        store.insert(&first).await.unwrap();

        let second = Submission::new(1, "inf", content("bbbbbbbbbbb", 1.0), t0());
        match store.insert(&second).await {
            Err(EngineError::AlreadySubmitted { submission_id }) => {
                assert_eq!(submission_id, first.submission_id)
            }
            other => panic!("unexpected {:?}", other),
        }

        // Same influencer, different campaign is fine
        let other = Submission::new(2, "inf", content("bbbbbbbbbbb", 1.0), t0());
        store.insert(&other).await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_only_when_resubmittable() {
        let store = InMemorySubmissionStore::new();
        let mut s = Submission::new(1, "inf", content("aaaaaaaaaaa", 1.0), t0());
        store.insert(&s).await.unwrap();

        s.apply_resubmission(content("bbbbbbbbbbb", 2.0), t0() + Duration::hours(1));
        assert!(!store.replace_if_resubmittable(&s).await.unwrap());

        let mut failed = VerificationRecord::failed(VerificationErrorCode::NoTranscript, "none");
        failed.verified_at = Some(t0());
        assert!(store
            .complete_verification(&s.submission_id, "aaaaaaaaaaa", &failed)
            .await
            .unwrap());

        assert!(store.replace_if_resubmittable(&s).await.unwrap());
        let stored = store.get(&s.submission_id).await.unwrap().unwrap();
        assert_eq!(stored.video_id, "bbbbbbbbbbb");
        assert_eq!(stored.verification.status, VerificationStatus::Pending);
    }

    #[tokio::test]
    async fn test_stale_verdict_discarded() {
        let store = InMemorySubmissionStore::new();
        let s = Submission::new(1, "inf", content("aaaaaaaaaaa", 1.0), t0());
        store.insert(&s).await.unwrap();

        let verdict = VerificationRecord::failed(VerificationErrorCode::InvalidVerdict, "bad");
        assert!(!store
            .complete_verification(&s.submission_id, "zzzzzzzzzzz", &verdict)
            .await
            .unwrap());
        assert!(store
            .complete_verification(&s.submission_id, "aaaaaaaaaaa", &verdict)
            .await
            .unwrap());
        // Already decided
        assert!(!store
            .complete_verification(&s.submission_id, "aaaaaaaaaaa", &verdict)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_reset_leaves_approved_verdict() {
        let store = InMemorySubmissionStore::new();
        let s = Submission::new(1, "inf", content("aaaaaaaaaaa", 1.0), t0());
        store.insert(&s).await.unwrap();

        let approved = VerificationRecord {
            status: VerificationStatus::Approved,
            approved: true,
            confidence: Some(90),
            verified_at: Some(t0() + Duration::minutes(5)),
            ..VerificationRecord::pending(t0())
        };
        assert!(store
            .complete_verification(&s.submission_id, "aaaaaaaaaaa", &approved)
            .await
            .unwrap());

        let reset = store
            .reset_verification(&s.submission_id, t0() + Duration::minutes(6))
            .await
            .unwrap();
        assert!(reset.is_none());
        let stored = store.get(&s.submission_id).await.unwrap().unwrap();
        assert_eq!(stored.verification.status, VerificationStatus::Approved);
        assert!(stored.verification.approved);

        // Non-final verdicts can still be reset
        let other = Submission::new(1, "other", content("bbbbbbbbbbb", 1.0), t0());
        store.insert(&other).await.unwrap();
        let reset = store
            .reset_verification(&other.submission_id, t0() + Duration::minutes(6))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reset.verification.status, VerificationStatus::Pending);
    }

    #[tokio::test]
    async fn test_ranked_and_stale_queries() {
        let store = InMemorySubmissionStore::new();
        let early = Submission::new(1, "a", content("aaaaaaaaaaa", 500.0), t0());
        let late = Submission::new(1, "b", content("aaaaaaaaaaa", 500.0), t0() + Duration::hours(1));
        let top = Submission::new(1, "c", content("ccccccccccc", 900.0), t0() + Duration::hours(2));
        for s in [&late, &top, &early] {
            store.insert(s).await.unwrap();
        }

        let ranked = store.ranked_for_campaign(1, Some(2)).await.unwrap();
        let ids: Vec<_> = ranked.iter().map(|s| s.influencer_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);

        let stale = store
            .stale_video_ids(t0() + Duration::minutes(90))
            .await
            .unwrap();
        assert_eq!(stale, vec!["aaaaaaaaaaa".to_string()]);

        let stats = VideoStats {
            view_count: 10,
            like_count: 1,
            comment_count: 0,
        };
        let n = store
            .update_metrics_for_video("aaaaaaaaaaa", stats, 30, 42.0, t0() + Duration::hours(3))
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert!(store
            .stale_video_ids(t0() + Duration::minutes(90))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_influencer_uniqueness() {
        let store = InMemoryInfluencerStore::new();
        let now = t0();
        let mk = |wallet: &str, channel: &str| Influencer {
            influencer_id: format!("id-{}", wallet),
            wallet_address: wallet.into(),
            channel_id: Some(channel.into()),
            channel_name: Some("name".into()),
            email: None,
            channel_verified: false,
            verification_method: None,
            verification_code: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
        };

        store.save(&mk("0xa", "UC1")).await.unwrap();
        store.save(&mk("0xa", "UC1")).await.unwrap();
        assert!(matches!(
            store.save(&mk("0xb", "UC1")).await,
            Err(EngineError::Validation(_))
        ));
        assert!(store.find_by_channel_id("UC1").await.unwrap().is_some());
        assert!(store.get_by_id("id-0xa").await.unwrap().is_some());
    }
}
