//! Submission document schema
//!
//! Counters are stored as `i64` since BSON has no unsigned integers.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::models::{
    RequirementsChecklist, Submission, VerificationErrorCode, VerificationRecord,
    VerificationStatus, VideoStats,
};

pub const SUBMISSION_COLLECTION: &str = "submissions";

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn to_u64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

/// Embedded verification sub-document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VerificationDoc {
    pub status: VerificationStatus,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub confidence: Option<i32>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub brand_mentions: Vec<String>,
    #[serde(default)]
    pub promotional_segment_word_count: i64,
    #[serde(default)]
    pub meets_requirements: RequirementsChecklist,
    #[serde(default)]
    pub transcript_language: Option<String>,
    #[serde(default)]
    pub transcript_length: Option<i64>,
    #[serde(default)]
    pub processing_time_ms: Option<i64>,
    #[serde(default)]
    pub requested_at: Option<DateTime>,
    #[serde(default)]
    pub verified_at: Option<DateTime>,
    #[serde(default)]
    pub error_code: Option<VerificationErrorCode>,
}

impl From<&VerificationRecord> for VerificationDoc {
    fn from(r: &VerificationRecord) -> Self {
        Self {
            status: r.status,
            approved: r.approved,
            confidence: r.confidence.map(i32::from),
            reason: r.reason.clone(),
            brand_mentions: r.brand_mentions.clone(),
            promotional_segment_word_count: i64::from(r.promotional_segment_word_count),
            meets_requirements: r.meets_requirements,
            transcript_language: r.transcript_language.clone(),
            transcript_length: r.transcript_length.map(to_i64),
            processing_time_ms: r.processing_time_ms.map(to_i64),
            requested_at: r.requested_at.map(DateTime::from_chrono),
            verified_at: r.verified_at.map(DateTime::from_chrono),
            error_code: r.error_code,
        }
    }
}

impl From<VerificationDoc> for VerificationRecord {
    fn from(d: VerificationDoc) -> Self {
        Self {
            status: d.status,
            approved: d.approved,
            confidence: d.confidence.map(|c| c.clamp(0, 100) as u8),
            reason: d.reason,
            brand_mentions: d.brand_mentions,
            promotional_segment_word_count: u32::try_from(d.promotional_segment_word_count)
                .unwrap_or(0),
            meets_requirements: d.meets_requirements,
            transcript_language: d.transcript_language,
            transcript_length: d.transcript_length.map(to_u64),
            processing_time_ms: d.processing_time_ms.map(to_u64),
            requested_at: d.requested_at.map(|t| t.to_chrono()),
            verified_at: d.verified_at.map(|t| t.to_chrono()),
            error_code: d.error_code,
        }
    }
}

impl VerificationDoc {
    /// `$set` document writing this sub-record in place, keeping
    /// `requested_at` untouched
    pub fn to_verdict_set(&self) -> Document {
        let mut set = Document::new();
        set.insert("verification.status", self.status.as_str());
        set.insert("verification.approved", self.approved);
        set.insert("verification.confidence", self.confidence);
        set.insert("verification.reason", self.reason.clone());
        set.insert("verification.brand_mentions", self.brand_mentions.clone());
        set.insert(
            "verification.promotional_segment_word_count",
            self.promotional_segment_word_count,
        );
        set.insert(
            "verification.meets_requirements",
            doc! {
                "mentionsBrand": self.meets_requirements.mentions_brand,
                "followsGuidelines": self.meets_requirements.follows_guidelines,
                "adequateWordCount": self.meets_requirements.adequate_word_count,
            },
        );
        set.insert(
            "verification.transcript_language",
            self.transcript_language.clone(),
        );
        set.insert("verification.transcript_length", self.transcript_length);
        set.insert("verification.processing_time_ms", self.processing_time_ms);
        set.insert("verification.verified_at", self.verified_at);
        set.insert(
            "verification.error_code",
            self.error_code.map(|c| c.as_str()),
        );
        set
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SubmissionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub submission_id: String,
    pub campaign_id: i64,
    pub influencer_id: String,
    pub video_id: String,
    pub video_url: String,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub duration_seconds: i64,
    pub performance_score: f64,
    pub last_analytics_update: DateTime,
    pub verification: VerificationDoc,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<&Submission> for SubmissionDoc {
    fn from(s: &Submission) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            submission_id: s.submission_id.clone(),
            campaign_id: to_i64(s.campaign_id),
            influencer_id: s.influencer_id.clone(),
            video_id: s.video_id.clone(),
            video_url: s.video_url.clone(),
            view_count: to_i64(s.stats.view_count),
            like_count: to_i64(s.stats.like_count),
            comment_count: to_i64(s.stats.comment_count),
            duration_seconds: to_i64(s.duration_seconds),
            performance_score: s.performance_score,
            last_analytics_update: DateTime::from_chrono(s.last_analytics_update),
            verification: VerificationDoc::from(&s.verification),
            created_at: DateTime::from_chrono(s.created_at),
            updated_at: DateTime::from_chrono(s.updated_at),
        }
    }
}

impl From<SubmissionDoc> for Submission {
    fn from(d: SubmissionDoc) -> Self {
        Self {
            submission_id: d.submission_id,
            campaign_id: to_u64(d.campaign_id),
            influencer_id: d.influencer_id,
            video_id: d.video_id,
            video_url: d.video_url,
            stats: VideoStats {
                view_count: to_u64(d.view_count),
                like_count: to_u64(d.like_count),
                comment_count: to_u64(d.comment_count),
            },
            duration_seconds: to_u64(d.duration_seconds),
            performance_score: d.performance_score,
            last_analytics_update: d.last_analytics_update.to_chrono(),
            verification: d.verification.into(),
            created_at: d.created_at.to_chrono(),
            updated_at: d.updated_at.to_chrono(),
        }
    }
}

/// `$set` document for a metrics refresh
pub fn metrics_set(
    stats: VideoStats,
    duration_seconds: u64,
    performance_score: f64,
    now: DateTime,
) -> Document {
    doc! {
        "view_count": to_i64(stats.view_count),
        "like_count": to_i64(stats.like_count),
        "comment_count": to_i64(stats.comment_count),
        "duration_seconds": to_i64(duration_seconds),
        "performance_score": performance_score,
        "last_analytics_update": now,
        "updated_at": now,
        "metadata.updated_at": now,
    }
}

impl IntoIndexes for SubmissionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "submission_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("submission_id_unique".to_string())
                        .build(),
                ),
            ),
            // One submission per influencer per campaign
            (
                doc! { "campaign_id": 1, "influencer_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("campaign_influencer_unique".to_string())
                        .build(),
                ),
            ),
            // Leaderboard order
            (
                doc! { "campaign_id": 1, "performance_score": -1, "created_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("campaign_rank_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "last_analytics_update": 1 },
                Some(
                    IndexOptions::builder()
                        .name("last_analytics_update_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "verification.status": 1, "verification.requested_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("verification_status_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for SubmissionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
