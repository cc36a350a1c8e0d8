//! Video metrics provider
//!
//! [`MetricsProvider`] is the seam the registry and channel verification
//! talk to. [`YouTubeMetrics`] implements it over the YouTube Data API v3,
//! with every call charged through the shared [`QuotaLimitedClient`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::quota::{QuotaLimitedClient, QuotaStatus};
use crate::models::VideoStats;
use crate::types::{EngineError, Result};

/// Quota units charged per endpoint
pub const VIDEOS_COST: u64 = 1;
pub const CHANNELS_COST: u64 = 1;
pub const SEARCH_COST: u64 = 100;

/// Fallback when a duration cannot be parsed
pub const DEFAULT_DURATION_SECONDS: u64 = 60;

/// Snippet, statistics and duration for one video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetails {
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub stats: VideoStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDetails {
    pub channel_id: String,
    pub title: String,
    pub description: String,
}

/// Entry from a channel's recent uploads
#[derive(Debug, Clone, PartialEq)]
pub struct RecentVideo {
    pub video_id: String,
    pub title: String,
    pub description: String,
}

#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// `None` when the provider has no such video
    async fn video_details(&self, video_id: &str) -> Result<Option<VideoDetails>>;

    async fn channel_details(&self, channel_id: &str) -> Result<Option<ChannelDetails>>;

    /// Most recent uploads, newest first
    async fn recent_videos(&self, channel_id: &str, limit: u32) -> Result<Vec<RecentVideo>>;

    /// Quota usage, for providers that meter calls
    fn quota_status(&self) -> Option<QuotaStatus> {
        None
    }
}

// ============================================================================
// YouTube Data API v3
// ============================================================================

pub struct YouTubeMetrics {
    client: Arc<QuotaLimitedClient>,
}

impl YouTubeMetrics {
    pub fn new(client: Arc<QuotaLimitedClient>) -> Self {
        Self { client }
    }
}

/// Statistics arrive as decimal strings; accept numbers too
fn count(value: &Value) -> u64 {
    match value {
        Value::String(s) => s.parse().unwrap_or(0),
        Value::Number(n) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn first_item(body: &Value) -> Option<&Value> {
    body.get("items")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
}

fn parse_video(video_id: &str, item: &Value) -> Result<VideoDetails> {
    let snippet = item.get("snippet").cloned().unwrap_or(Value::Null);
    let statistics = item.get("statistics").cloned().unwrap_or(Value::Null);

    let published_at = snippet
        .get("publishedAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| {
            EngineError::TransientExternal(format!("video {} has no publish time", video_id))
        })?;

    let duration_seconds = item
        .get("contentDetails")
        .and_then(|c| c.get("duration"))
        .and_then(Value::as_str)
        .map(parse_iso_duration)
        .unwrap_or(DEFAULT_DURATION_SECONDS);

    Ok(VideoDetails {
        video_id: video_id.to_string(),
        channel_id: text(&snippet, "channelId"),
        title: text(&snippet, "title"),
        description: text(&snippet, "description"),
        published_at,
        duration_seconds,
        stats: VideoStats {
            view_count: statistics.get("viewCount").map(count).unwrap_or(0),
            like_count: statistics.get("likeCount").map(count).unwrap_or(0),
            comment_count: statistics.get("commentCount").map(count).unwrap_or(0),
        },
    })
}

#[async_trait]
impl MetricsProvider for YouTubeMetrics {
    async fn video_details(&self, video_id: &str) -> Result<Option<VideoDetails>> {
        let body = self
            .client
            .request(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails".to_string()),
                    ("id", video_id.to_string()),
                ],
                VIDEOS_COST,
            )
            .await?;

        match first_item(&body) {
            Some(item) => parse_video(video_id, item).map(Some),
            None => {
                debug!(video_id, "Video not found");
                Ok(None)
            }
        }
    }

    async fn channel_details(&self, channel_id: &str) -> Result<Option<ChannelDetails>> {
        let body = self
            .client
            .request(
                "channels",
                &[
                    ("part", "snippet".to_string()),
                    ("id", channel_id.to_string()),
                ],
                CHANNELS_COST,
            )
            .await?;

        Ok(first_item(&body).map(|item| {
            let snippet = item.get("snippet").cloned().unwrap_or(Value::Null);
            ChannelDetails {
                channel_id: channel_id.to_string(),
                title: text(&snippet, "title"),
                description: text(&snippet, "description"),
            }
        }))
    }

    async fn recent_videos(&self, channel_id: &str, limit: u32) -> Result<Vec<RecentVideo>> {
        let body = self
            .client
            .request(
                "search",
                &[
                    ("part", "snippet".to_string()),
                    ("channelId", channel_id.to_string()),
                    ("type", "video".to_string()),
                    ("order", "date".to_string()),
                    ("maxResults", limit.to_string()),
                ],
                SEARCH_COST,
            )
            .await?;

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter_map(|item| {
                let video_id = item.get("id")?.get("videoId")?.as_str()?.to_string();
                let snippet = item.get("snippet").cloned().unwrap_or(Value::Null);
                Some(RecentVideo {
                    video_id,
                    title: text(&snippet, "title"),
                    description: text(&snippet, "description"),
                })
            })
            .collect())
    }

    fn quota_status(&self) -> Option<QuotaStatus> {
        Some(self.client.status())
    }
}

// ============================================================================
// Parsing helpers
// ============================================================================

/// Parse an ISO-8601 `PT#H#M#S` duration into seconds.
///
/// Returns 60 when the value is not a time duration.
pub fn parse_iso_duration(duration: &str) -> u64 {
    let Some(rest) = duration.trim().strip_prefix("PT") else {
        return DEFAULT_DURATION_SECONDS;
    };

    let mut total = 0u64;
    let mut digits = String::new();
    let mut last_unit = 0u8;

    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let (multiplier, rank) = match c {
            'H' => (3600, 1),
            'M' => (60, 2),
            'S' => (1, 3),
            _ => return DEFAULT_DURATION_SECONDS,
        };
        // Units must appear once each, in H, M, S order
        if rank <= last_unit {
            return DEFAULT_DURATION_SECONDS;
        }
        let Some(next) = digits
            .parse::<u64>()
            .ok()
            .and_then(|value| value.checked_mul(multiplier))
            .and_then(|seconds| total.checked_add(seconds))
        else {
            return DEFAULT_DURATION_SECONDS;
        };
        total = next;
        digits.clear();
        last_unit = rank;
    }

    if digits.is_empty() {
        total
    } else {
        DEFAULT_DURATION_SECONDS
    }
}

fn leading_video_id(segment: &str) -> Option<String> {
    let id: String = segment.chars().take(11).collect();
    let valid = id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

/// Extract the 11-character video id from a watch, short-link, embed,
/// `/v/` or `/shorts/` URL
pub fn extract_video_id(url: &str) -> Option<String> {
    let trimmed = url.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    if let Ok(parsed) = reqwest::Url::parse(&with_scheme) {
        let host = parsed.host_str().unwrap_or_default().to_lowercase();
        let host = host
            .trim_start_matches("www.")
            .trim_start_matches("m.")
            .to_string();
        let mut segments = parsed
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter();

        if host == "youtu.be" {
            return segments.next().and_then(leading_video_id);
        }

        if host.ends_with("youtube.com") || host.ends_with("youtube-nocookie.com") {
            if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                return leading_video_id(&v);
            }
            if let (Some(kind), Some(id)) = (segments.next(), segments.next()) {
                if matches!(kind, "embed" | "e" | "v" | "shorts" | "live") {
                    return leading_video_id(id);
                }
            }
            return None;
        }
    }

    // Fallback for anything carrying a v= parameter
    trimmed
        .split(['?', '&'])
        .find_map(|part| part.strip_prefix("v="))
        .and_then(leading_video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_duration() {
        assert_eq!(parse_iso_duration("PT1M30S"), 90);
        assert_eq!(parse_iso_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_iso_duration("PT45S"), 45);
        assert_eq!(parse_iso_duration("PT10M"), 600);
        assert_eq!(parse_iso_duration("PT"), 0);
    }

    #[test]
    fn test_parse_iso_duration_fallback() {
        assert_eq!(parse_iso_duration(""), 60);
        assert_eq!(parse_iso_duration("P1D"), 60);
        assert_eq!(parse_iso_duration("PT5X"), 60);
        assert_eq!(parse_iso_duration("PT5S1M"), 60);
        assert_eq!(parse_iso_duration("PT12"), 60);
        assert_eq!(parse_iso_duration("PT9999999999999999H"), 60);
        assert_eq!(parse_iso_duration("PT99999999999999999999S"), 60);
        assert_eq!(parse_iso_duration("PT5124095576030431H59M59S"), 60);
    }

    #[test]
    fn test_extract_video_id_formats() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(
            extract_video_id("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=10"),
            id
        );
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/v/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("m.youtube.com/watch?v=dQw4w9WgXcQ"), id);
    }

    #[test]
    fn test_extract_video_id_rejects() {
        assert_eq!(extract_video_id("https://vimeo.com/123456789"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/channel/UC123"), None);
        assert_eq!(extract_video_id("not a url"), None);
    }

    #[test]
    fn test_parse_video_counts_from_strings() {
        let item = serde_json::json!({
            "snippet": {
                "channelId": "UC1",
                "title": "Launch",
                "description": "with code ABC",
                "publishedAt": "2025-01-02T03:04:05Z"
            },
            "statistics": {"viewCount": "1200", "likeCount": "45", "commentCount": 6},
            "contentDetails": {"duration": "PT2M"}
        });
        let video = parse_video("dQw4w9WgXcQ", &item).unwrap();
        assert_eq!(video.channel_id, "UC1");
        assert_eq!(video.duration_seconds, 120);
        assert_eq!(
            video.stats,
            VideoStats {
                view_count: 1200,
                like_count: 45,
                comment_count: 6
            }
        );
    }
}
