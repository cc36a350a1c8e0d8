//! Performance scoring
//!
//! Maps engagement counters onto a single rank-comparable score. Views
//! count logarithmically and engagement is only credited up to a 10%
//! engagement-to-view ratio, so neither bought views nor bought likes move
//! a submission far up the leaderboard.

use rand::Rng;

use crate::models::VideoStats;

const VIEW_WEIGHT: f64 = 40.0;
const ENGAGEMENT_WEIGHT: f64 = 30.0;
const MAX_ENGAGEMENT_RATIO: f64 = 0.10;

const LIKE_QUALITY_WEIGHT: f64 = 4.0;
const LIKE_QUALITY_CAP: f64 = 20.0;
const COMMENT_QUALITY_WEIGHT: f64 = 5.0;
const COMMENT_QUALITY_CAP: f64 = 10.0;
const DURATION_QUALITY_CAP: f64 = 20.0;

const JITTER_MAX: f64 = 0.1;

/// Deterministic score. Non-negative and non-decreasing in every argument.
///
/// Engagement enters as the log of capped counts, not as a likes-per-view
/// ratio: with a ratio term, more views at equal engagement would lower the
/// score.
pub fn base_score(views: u64, likes: u64, comments: u64, duration_seconds: u64) -> f64 {
    let v = (views as f64).max(1.0);
    let engagement_cap = MAX_ENGAGEMENT_RATIO * v;

    let view_component = VIEW_WEIGHT * v.log10();

    let credited = ((likes as f64) + (comments as f64)).min(engagement_cap);
    let engagement_component = ENGAGEMENT_WEIGHT * (1.0 + credited).log10();

    let like_quality = (LIKE_QUALITY_WEIGHT * (1.0 + (likes as f64).min(engagement_cap)).log10())
        .min(LIKE_QUALITY_CAP);
    let comment_quality = (COMMENT_QUALITY_WEIGHT
        * (1.0 + (comments as f64).min(engagement_cap)).log10())
    .min(COMMENT_QUALITY_CAP);
    let duration_quality = (duration_seconds as f64 / 10.0).min(DURATION_QUALITY_CAP);

    view_component + engagement_component + like_quality + comment_quality + duration_quality
}

/// Scorer with optional tie-breaking jitter
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceScorer {
    jitter: bool,
}

impl PerformanceScorer {
    pub fn new(jitter: bool) -> Self {
        Self { jitter }
    }

    /// Score with jitter in `[0, 0.1)` added when enabled
    pub fn score(&self, views: u64, likes: u64, comments: u64, duration_seconds: u64) -> f64 {
        let base = base_score(views, likes, comments, duration_seconds);
        if self.jitter {
            base + rand::thread_rng().gen_range(0.0..JITTER_MAX)
        } else {
            base
        }
    }

    pub fn score_stats(&self, stats: &VideoStats, duration_seconds: u64) -> f64 {
        self.score(
            stats.view_count,
            stats.like_count,
            stats.comment_count,
            duration_seconds,
        )
    }
}
