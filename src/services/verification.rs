//! Content verification
//!
//! [`VerificationPipeline`] turns (video, campaign) into a verdict and
//! writes it back onto the submission. [`VerificationQueue`] runs the
//! pipeline detached from the request that asked for it, drops duplicate
//! jobs for the same submission and video, and periodically re-enqueues
//! submissions that have been pending for too long.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::judge::{build_prompt, parse_verdict, LlmJudge};
use super::transcript::TranscriptProvider;
use crate::clock::Clock;
use crate::models::{Campaign, VerificationErrorCode, VerificationRecord, VerificationStatus};
use crate::store::{CampaignStore, SubmissionStore};
use crate::types::{EngineError, Result};

pub const DISABLED_REASON: &str = "Content verification disabled for this campaign";
pub const NO_TRANSCRIPT_REASON: &str =
    "No transcript available for this video. Captions or subtitles may be disabled.";

pub struct VerificationPipeline {
    submissions: Arc<dyn SubmissionStore>,
    transcripts: Arc<dyn TranscriptProvider>,
    judge: Arc<dyn LlmJudge>,
    clock: Arc<dyn Clock>,
}

impl VerificationPipeline {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        transcripts: Arc<dyn TranscriptProvider>,
        judge: Arc<dyn LlmJudge>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            submissions,
            transcripts,
            judge,
            clock,
        }
    }

    fn finish(&self, mut record: VerificationRecord, started: Instant) -> VerificationRecord {
        record.processing_time_ms = Some(started.elapsed().as_millis() as u64);
        record.verified_at = Some(self.clock.now());
        record
    }

    /// Produce a verdict without persisting it. Never fails; every failure
    /// becomes a record in `error` state.
    pub async fn evaluate(&self, video_id: &str, campaign: &Campaign) -> VerificationRecord {
        let started = Instant::now();

        if !campaign.verification.enabled {
            let mut record = VerificationRecord::pending(self.clock.now());
            record.status = VerificationStatus::Approved;
            record.approved = true;
            record.reason = Some(DISABLED_REASON.to_string());
            return self.finish(record, started);
        }

        let transcript = match self.transcripts.fetch(video_id).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                debug!(video_id, "No transcript");
                let record =
                    VerificationRecord::failed(VerificationErrorCode::NoTranscript, NO_TRANSCRIPT_REASON);
                return self.finish(record, started);
            }
            Err(e) => {
                warn!(video_id, error = %e, "Transcript fetch failed");
                let record = VerificationRecord::failed(
                    VerificationErrorCode::TranscriptUnavailable,
                    format!("Transcript could not be fetched: {}", e),
                );
                return self.finish(record, started);
            }
        };

        let transcript_length = transcript.text.chars().count() as u64;
        let with_transcript = |mut record: VerificationRecord| {
            record.transcript_language = transcript.language.clone();
            record.transcript_length = Some(transcript_length);
            record
        };

        let prompt = build_prompt(campaign, &transcript.text);
        let reply = match self.judge.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(video_id, error = %e, "Judge unavailable");
                let record = VerificationRecord::failed(
                    VerificationErrorCode::JudgeUnavailable,
                    format!("Content judge unavailable: {}", e),
                );
                return self.finish(with_transcript(record), started);
            }
        };

        let verdict = match parse_verdict(&reply) {
            Ok(v) => v,
            Err(e) => {
                warn!(video_id, error = %e, "Unusable judge reply");
                let reason = match e {
                    EngineError::VerificationProcessing { message, .. } => message,
                    other => other.to_string(),
                };
                let record = VerificationRecord::failed(
                    VerificationErrorCode::InvalidVerdict,
                    format!("Judge reply could not be parsed: {}", reason),
                );
                return self.finish(with_transcript(record), started);
            }
        };

        let record = VerificationRecord {
            status: if verdict.approved {
                VerificationStatus::Approved
            } else {
                VerificationStatus::Rejected
            },
            approved: verdict.approved,
            confidence: verdict.confidence,
            reason: verdict.reason,
            brand_mentions: verdict.brand_mentions,
            promotional_segment_word_count: verdict.promotional_segment_word_count,
            meets_requirements: verdict.meets_requirements,
            transcript_language: None,
            transcript_length: None,
            processing_time_ms: None,
            requested_at: None,
            verified_at: None,
            error_code: None,
        };
        self.finish(with_transcript(record), started)
    }

    /// Evaluate and write the verdict onto the submission. The write is
    /// dropped if the submission has since moved to another video or left
    /// the pending state.
    pub async fn verify(
        &self,
        submission_id: &str,
        video_id: &str,
        campaign: &Campaign,
    ) -> VerificationRecord {
        let record = self.evaluate(video_id, campaign).await;

        match self
            .submissions
            .complete_verification(submission_id, video_id, &record)
            .await
        {
            Ok(true) => info!(
                submission_id,
                video_id,
                status = %record.status,
                error_code = ?record.error_code.map(|c| c.as_str()),
                elapsed_ms = ?record.processing_time_ms,
                "Verification recorded"
            ),
            Ok(false) => info!(
                submission_id,
                video_id, "Verification discarded, submission changed meanwhile"
            ),
            Err(e) => error!(submission_id, error = %e, "Failed to store verification"),
        }

        record
    }
}

// ============================================================================
// Queue
// ============================================================================

/// Detached verification jobs keyed by (submission, video)
pub struct VerificationQueue {
    pipeline: Arc<VerificationPipeline>,
    submissions: Arc<dyn SubmissionStore>,
    campaigns: Arc<dyn CampaignStore>,
    clock: Arc<dyn Clock>,
    in_flight: Arc<DashMap<String, DateTime<Utc>>>,
}

impl VerificationQueue {
    pub fn new(
        pipeline: Arc<VerificationPipeline>,
        submissions: Arc<dyn SubmissionStore>,
        campaigns: Arc<dyn CampaignStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pipeline,
            submissions,
            campaigns,
            clock,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    fn job_key(submission_id: &str, video_id: &str) -> String {
        format!("{}:{}", submission_id, video_id)
    }

    /// Spawn a verification job. Returns `None` when the same job is
    /// already running.
    pub fn enqueue(
        &self,
        submission_id: String,
        video_id: String,
        campaign: Campaign,
    ) -> Option<JoinHandle<()>> {
        let key = Self::job_key(&submission_id, &video_id);
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => {
                debug!(%submission_id, %video_id, "Verification already in flight");
                return None;
            }
            Entry::Vacant(slot) => {
                slot.insert(self.clock.now());
            }
        }

        let pipeline = Arc::clone(&self.pipeline);
        let in_flight = Arc::clone(&self.in_flight);
        Some(tokio::spawn(async move {
            pipeline.verify(&submission_id, &video_id, &campaign).await;
            in_flight.remove(&key);
        }))
    }

    /// Number of running jobs
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Re-enqueue submissions pending for longer than `stale_after`
    pub async fn sweep(&self, stale_after: chrono::Duration) -> Result<Vec<JoinHandle<()>>> {
        let cutoff = self.clock.now() - stale_after;
        let pending = self.submissions.pending_verifications(cutoff).await?;

        let mut campaigns: HashMap<u64, Option<Campaign>> = HashMap::new();
        let mut handles = Vec::new();

        for submission in pending {
            let campaign = match campaigns.get(&submission.campaign_id) {
                Some(c) => c.clone(),
                None => {
                    let c = self.campaigns.get(submission.campaign_id).await?;
                    campaigns.insert(submission.campaign_id, c.clone());
                    c
                }
            };
            let Some(campaign) = campaign else {
                warn!(
                    submission_id = %submission.submission_id,
                    campaign_id = submission.campaign_id,
                    "Pending submission references unknown campaign"
                );
                continue;
            };

            if let Some(handle) =
                self.enqueue(submission.submission_id, submission.video_id, campaign)
            {
                handles.push(handle);
            }
        }

        if !handles.is_empty() {
            info!(count = handles.len(), "Re-enqueued stale verifications");
        }
        Ok(handles)
    }

    /// Run [`sweep`](Self::sweep) on a fixed interval
    pub fn start_sweeper(self: Arc<Self>, every: Duration, stale_after: chrono::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep(stale_after).await {
                    error!(error = %e, "Verification sweep failed");
                }
            }
        })
    }
}
