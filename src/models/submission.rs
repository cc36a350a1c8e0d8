//! Submission record, metrics snapshot and verification sub-record

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verification lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
    Error,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }

    /// Rejected and errored submissions may be replaced by a new video
    pub fn is_resubmittable(&self) -> bool {
        matches!(self, Self::Rejected | Self::Error)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason for a verification in `error` state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationErrorCode {
    NoTranscript,
    TranscriptUnavailable,
    JudgeUnavailable,
    InvalidVerdict,
}

impl VerificationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoTranscript => "NO_TRANSCRIPT",
            Self::TranscriptUnavailable => "TRANSCRIPT_UNAVAILABLE",
            Self::JudgeUnavailable => "JUDGE_UNAVAILABLE",
            Self::InvalidVerdict => "INVALID_VERDICT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NO_TRANSCRIPT" => Some(Self::NoTranscript),
            "TRANSCRIPT_UNAVAILABLE" => Some(Self::TranscriptUnavailable),
            "JUDGE_UNAVAILABLE" => Some(Self::JudgeUnavailable),
            "INVALID_VERDICT" => Some(Self::InvalidVerdict),
            _ => None,
        }
    }
}

/// Judge checklist over the campaign requirements
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsChecklist {
    #[serde(default)]
    pub mentions_brand: bool,
    #[serde(default)]
    pub follows_guidelines: bool,
    #[serde(default)]
    pub adequate_word_count: bool,
}

/// Outcome of content verification, embedded in a submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub status: VerificationStatus,
    pub approved: bool,
    pub confidence: Option<u8>,
    pub reason: Option<String>,
    #[serde(default)]
    pub brand_mentions: Vec<String>,
    #[serde(default)]
    pub promotional_segment_word_count: u32,
    #[serde(default)]
    pub meets_requirements: RequirementsChecklist,
    pub transcript_language: Option<String>,
    pub transcript_length: Option<u64>,
    pub processing_time_ms: Option<u64>,
    pub requested_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub error_code: Option<VerificationErrorCode>,
}

impl VerificationRecord {
    /// Fresh record awaiting a verdict
    pub fn pending(requested_at: DateTime<Utc>) -> Self {
        Self {
            status: VerificationStatus::Pending,
            approved: false,
            confidence: None,
            reason: None,
            brand_mentions: Vec::new(),
            promotional_segment_word_count: 0,
            meets_requirements: RequirementsChecklist::default(),
            transcript_language: None,
            transcript_length: None,
            processing_time_ms: None,
            requested_at: Some(requested_at),
            verified_at: None,
            error_code: None,
        }
    }

    /// Record in `error` state carrying a reason and code
    pub fn failed(code: VerificationErrorCode, reason: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Error,
            reason: Some(reason.into()),
            error_code: Some(code),
            requested_at: None,
            ..Self::pending(Utc::now())
        }
    }
}

/// Engagement counters for one video
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoStats {
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

/// New content for a submission, validated and scored
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionContent {
    pub video_id: String,
    pub video_url: String,
    pub stats: VideoStats,
    pub duration_seconds: u64,
    pub performance_score: f64,
}

/// One influencer's entry into one campaign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: String,
    pub campaign_id: u64,
    pub influencer_id: String,
    pub video_id: String,
    pub video_url: String,
    #[serde(flatten)]
    pub stats: VideoStats,
    pub duration_seconds: u64,
    pub performance_score: f64,
    pub last_analytics_update: DateTime<Utc>,
    pub verification: VerificationRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        campaign_id: u64,
        influencer_id: impl Into<String>,
        content: SubmissionContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            submission_id: Uuid::new_v4().to_string(),
            campaign_id,
            influencer_id: influencer_id.into(),
            video_id: content.video_id,
            video_url: content.video_url,
            stats: content.stats,
            duration_seconds: content.duration_seconds,
            performance_score: content.performance_score,
            last_analytics_update: now,
            verification: VerificationRecord::pending(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the content in place. Identity and `created_at` are kept.
    pub fn apply_resubmission(&mut self, content: SubmissionContent, now: DateTime<Utc>) {
        self.video_id = content.video_id;
        self.video_url = content.video_url;
        self.stats = content.stats;
        self.duration_seconds = content.duration_seconds;
        self.performance_score = content.performance_score;
        self.last_analytics_update = now;
        self.verification = VerificationRecord::pending(now);
        self.updated_at = now;
    }
}

/// Ranking order: score descending, then earliest entry, then id
pub fn rank_order(a: &Submission, b: &Submission) -> Ordering {
    b.performance_score
        .total_cmp(&a.performance_score)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.submission_id.cmp(&b.submission_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn content(video_id: &str, score: f64) -> SubmissionContent {
        SubmissionContent {
            video_id: video_id.into(),
            video_url: format!("https://youtu.be/{}", video_id),
            stats: VideoStats {
                view_count: 100,
                like_count: 5,
                comment_count: 1,
            },
            duration_seconds: 90,
            performance_score: score,
        }
    }

    #[test]
    fn test_new_submission_is_pending() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let s = Submission::new(1, "inf-1", content("dQw4w9WgXcQ", 10.0), now);
        assert_eq!(s.verification.status, VerificationStatus::Pending);
        assert_eq!(s.verification.requested_at, Some(now));
        assert_eq!(s.created_at, now);
    }

    #[test]
    fn test_resubmission_keeps_identity() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(3);
        let mut s = Submission::new(1, "inf-1", content("aaaaaaaaaaa", 10.0), t0);
        s.verification.status = VerificationStatus::Rejected;
        let id = s.submission_id.clone();

        s.apply_resubmission(content("bbbbbbbbbbb", 2.0), t1);

        assert_eq!(s.submission_id, id);
        assert_eq!(s.created_at, t0);
        assert_eq!(s.updated_at, t1);
        assert_eq!(s.video_id, "bbbbbbbbbbb");
        assert_eq!(s.verification.status, VerificationStatus::Pending);
    }

    #[test]
    fn test_rank_order_ties_break_on_created_at() {
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t2 = t1 + Duration::minutes(5);
        let a = Submission::new(1, "a", content("aaaaaaaaaaa", 500.0), t1);
        let b = Submission::new(1, "b", content("bbbbbbbbbbb", 500.0), t2);
        let c = Submission::new(1, "c", content("ccccccccccc", 600.0), t2);

        let mut ranked = vec![b.clone(), a.clone(), c.clone()];
        ranked.sort_by(rank_order);
        let order: Vec<_> = ranked.iter().map(|s| s.influencer_id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_status_resubmittable() {
        assert!(!VerificationStatus::Pending.is_resubmittable());
        assert!(!VerificationStatus::Approved.is_resubmittable());
        assert!(VerificationStatus::Rejected.is_resubmittable());
        assert!(VerificationStatus::Error.is_resubmittable());
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&VerificationErrorCode::NoTranscript).unwrap();
        assert_eq!(json, "\"NO_TRANSCRIPT\"");
        assert_eq!(
            VerificationErrorCode::parse("INVALID_VERDICT"),
            Some(VerificationErrorCode::InvalidVerdict)
        );
    }
}
