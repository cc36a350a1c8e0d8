//! Submission registry
//!
//! Owns the submission lifecycle: validated creation, in-place
//! resubmission of rejected or errored entries, metrics refresh and
//! ranking.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::metrics::{extract_video_id, MetricsProvider};
use super::scoring::PerformanceScorer;
use super::verification::VerificationQueue;
use crate::clock::Clock;
use crate::models::{
    normalize_wallet, Submission, SubmissionContent, VerificationRecord, VerificationStatus,
};
use crate::store::{CampaignStore, InfluencerStore, SubmissionStore};
use crate::types::{EngineError, Result};

/// Submission request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub campaign_id: u64,
    pub wallet_address: String,
    pub video_url: String,
}

/// A submission joined with the wallet that would be paid
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSubmission {
    pub submission: Submission,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub submission_id: String,
    pub wallet_address: String,
    pub video_id: String,
    pub video_url: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub performance_score: f64,
    pub verification_status: VerificationStatus,
}

pub struct SubmissionRegistry {
    campaigns: Arc<dyn CampaignStore>,
    influencers: Arc<dyn InfluencerStore>,
    submissions: Arc<dyn SubmissionStore>,
    metrics: Arc<dyn MetricsProvider>,
    scorer: PerformanceScorer,
    queue: Arc<VerificationQueue>,
    clock: Arc<dyn Clock>,
}

impl SubmissionRegistry {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        influencers: Arc<dyn InfluencerStore>,
        submissions: Arc<dyn SubmissionStore>,
        metrics: Arc<dyn MetricsProvider>,
        scorer: PerformanceScorer,
        queue: Arc<VerificationQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            campaigns,
            influencers,
            submissions,
            metrics,
            scorer,
            queue,
            clock,
        }
    }

    /// Record a submission, or replace a rejected/errored one in place.
    /// Nothing is written when a precondition fails.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Submission> {
        let wallet = normalize_wallet(&request.wallet_address);

        let influencer = self
            .influencers
            .get_by_wallet(&wallet)
            .await?
            .ok_or_else(|| EngineError::NotFound("influencer profile".into()))?;
        if !influencer.can_submit() {
            return Err(EngineError::Validation(
                "channel must be verified before entering campaigns".into(),
            ));
        }
        let channel_id = influencer.channel_id.clone().unwrap_or_default();

        let campaign = self
            .campaigns
            .get(request.campaign_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("campaign {}", request.campaign_id)))?;

        let video_id = extract_video_id(&request.video_url)
            .ok_or_else(|| EngineError::Validation("invalid video URL".into()))?;

        let video = self
            .metrics
            .video_details(&video_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("video {}", video_id)))?;

        if video.channel_id != channel_id {
            return Err(EngineError::OwnershipMismatch {
                expected: channel_id,
                actual: video.channel_id,
            });
        }
        if video.published_at < campaign.created_at {
            return Err(EngineError::Validation(format!(
                "video was published at {}, before the campaign started at {}",
                video.published_at.to_rfc3339(),
                campaign.created_at.to_rfc3339()
            )));
        }

        let existing = self
            .submissions
            .find_by_pair(campaign.campaign_id, &influencer.influencer_id)
            .await?;
        if let Some(existing) = &existing {
            if !existing.verification.status.is_resubmittable() {
                return Err(EngineError::AlreadySubmitted {
                    submission_id: existing.submission_id.clone(),
                });
            }
        }

        let content = SubmissionContent {
            video_id: video_id.clone(),
            video_url: request.video_url.trim().to_string(),
            stats: video.stats,
            duration_seconds: video.duration_seconds,
            performance_score: self.scorer.score_stats(&video.stats, video.duration_seconds),
        };
        let now = self.clock.now();

        let submission = match existing {
            Some(mut existing) => {
                existing.apply_resubmission(content, now);
                if !self.submissions.replace_if_resubmittable(&existing).await? {
                    return Err(EngineError::AlreadySubmitted {
                        submission_id: existing.submission_id,
                    });
                }
                info!(
                    submission_id = %existing.submission_id,
                    campaign_id = campaign.campaign_id,
                    %video_id,
                    "Submission replaced"
                );
                existing
            }
            None => {
                let submission =
                    Submission::new(campaign.campaign_id, &influencer.influencer_id, content, now);
                self.submissions.insert(&submission).await?;
                info!(
                    submission_id = %submission.submission_id,
                    campaign_id = campaign.campaign_id,
                    %video_id,
                    score = submission.performance_score,
                    "Submission created"
                );
                submission
            }
        };

        self.queue.enqueue(
            submission.submission_id.clone(),
            submission.video_id.clone(),
            campaign,
        );
        Ok(submission)
    }

    /// Refresh metrics of every video not refreshed within `max_age`.
    /// Returns the number of videos refreshed.
    pub async fn refresh_stale(&self, max_age: Duration) -> Result<usize> {
        let now = self.clock.now();
        let video_ids = self.submissions.stale_video_ids(now - max_age).await?;
        debug!(count = video_ids.len(), "Stale videos");

        let mut refreshed = 0;
        for video_id in video_ids {
            let video = match self.metrics.video_details(&video_id).await {
                Ok(Some(v)) => v,
                Ok(None) => {
                    warn!(%video_id, "Video no longer available, metrics kept");
                    continue;
                }
                Err(e @ EngineError::QuotaExceeded { .. }) => {
                    warn!(error = %e, "Quota exhausted, stopping analytics refresh");
                    break;
                }
                Err(e) => {
                    warn!(%video_id, error = %e, "Metrics refresh failed");
                    continue;
                }
            };

            let score = self.scorer.score_stats(&video.stats, video.duration_seconds);
            match self
                .submissions
                .update_metrics_for_video(&video_id, video.stats, video.duration_seconds, score, now)
                .await
            {
                Ok(updated) => {
                    debug!(%video_id, updated, score, "Metrics refreshed");
                    refreshed += 1;
                }
                Err(e) => warn!(%video_id, error = %e, "Failed to store refreshed metrics"),
            }
        }

        info!(refreshed, "Analytics refresh complete");
        Ok(refreshed)
    }

    /// Submissions in rank order joined with wallet addresses
    pub async fn ranked(&self, campaign_id: u64, limit: Option<usize>) -> Result<Vec<RankedSubmission>> {
        let submissions = self.submissions.ranked_for_campaign(campaign_id, limit).await?;
        let mut wallets: HashMap<String, Option<String>> = HashMap::new();
        let mut ranked = Vec::with_capacity(submissions.len());

        for submission in submissions {
            let wallet = match wallets.get(&submission.influencer_id) {
                Some(w) => w.clone(),
                None => {
                    let w = self
                        .influencers
                        .get_by_id(&submission.influencer_id)
                        .await?
                        .map(|i| i.wallet_address);
                    wallets.insert(submission.influencer_id.clone(), w.clone());
                    w
                }
            };
            match wallet {
                Some(wallet_address) => ranked.push(RankedSubmission {
                    submission,
                    wallet_address,
                }),
                None => warn!(
                    submission_id = %submission.submission_id,
                    "Submission has no influencer profile, left out of ranking"
                ),
            }
        }
        Ok(ranked)
    }

    pub async fn leaderboard(&self, campaign_id: u64) -> Result<Vec<LeaderboardEntry>> {
        if self.campaigns.get(campaign_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("campaign {}", campaign_id)));
        }

        Ok(self
            .ranked(campaign_id, None)
            .await?
            .into_iter()
            .enumerate()
            .map(|(i, r)| LeaderboardEntry {
                rank: i + 1,
                submission_id: r.submission.submission_id,
                wallet_address: r.wallet_address,
                video_id: r.submission.video_id,
                video_url: r.submission.video_url,
                view_count: r.submission.stats.view_count,
                like_count: r.submission.stats.like_count,
                comment_count: r.submission.stats.comment_count,
                performance_score: r.submission.performance_score,
                verification_status: r.submission.verification.status,
            })
            .collect())
    }

    /// Submissions of a campaign, newest first
    pub async fn list_for_campaign(&self, campaign_id: u64) -> Result<Vec<Submission>> {
        self.submissions.list_for_campaign(campaign_id).await
    }

    pub async fn verification_status(&self, submission_id: &str) -> Result<VerificationRecord> {
        self.submissions
            .get(submission_id)
            .await?
            .map(|s| s.verification)
            .ok_or_else(|| EngineError::NotFound(format!("submission {}", submission_id)))
    }

    /// Reset the verdict to pending and run verification again.
    /// Approved submissions are final.
    pub async fn retrigger_verification(&self, submission_id: &str) -> Result<Submission> {
        let current = self
            .submissions
            .get(submission_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("submission {}", submission_id)))?;
        if current.verification.status == VerificationStatus::Approved {
            return Err(EngineError::Validation(
                "submission is already approved".into(),
            ));
        }

        let campaign = self
            .campaigns
            .get(current.campaign_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("campaign {}", current.campaign_id)))?;

        // A verdict may have landed since the read above
        let submission = self
            .submissions
            .reset_verification(submission_id, self.clock.now())
            .await?
            .ok_or_else(|| {
                EngineError::Validation("submission is already approved".into())
            })?;

        info!(submission_id, "Verification re-triggered");
        self.queue.enqueue(
            submission.submission_id.clone(),
            submission.video_id.clone(),
            campaign,
        );
        Ok(submission)
    }
}
