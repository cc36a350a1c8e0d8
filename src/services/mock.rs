//! Mock collaborators for dev mode and tests.
//!
//! Configurable in-process stand-ins for the metrics provider, the
//! transcript provider and the LLM judge.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::judge::LlmJudge;
use super::metrics::{ChannelDetails, MetricsProvider, RecentVideo, VideoDetails};
use super::transcript::{Transcript, TranscriptProvider};
use crate::models::VideoStats;
use crate::types::{EngineError, Result};

/// Judge reply approving any content
pub const APPROVING_REPLY: &str = r#"{"approved": true, "confidence": 90, "reason": "Mock judge approves all content", "brandMentions": [], "promotionalSegmentWordCount": 0, "meetsRequirements": {"mentionsBrand": true, "followsGuidelines": true, "adequateWordCount": true}}"#;

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Default)]
pub struct MockMetrics {
    videos: RwLock<HashMap<String, VideoDetails>>,
    channels: RwLock<HashMap<String, ChannelDetails>>,
    failing: AtomicBool,
    call_count: AtomicU32,
}

impl MockMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_video(&self, video: VideoDetails) {
        write(&self.videos).insert(video.video_id.clone(), video);
    }

    pub fn add_channel(&self, channel: ChannelDetails) {
        write(&self.channels).insert(channel.channel_id.clone(), channel);
    }

    /// Replace the counters of a known video
    pub fn set_stats(&self, video_id: &str, stats: VideoStats) {
        if let Some(video) = write(&self.videos).get_mut(video_id) {
            video.stats = stats;
        }
    }

    /// Make every call fail with a transient error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    fn begin_call(&self) -> Result<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::TransientExternal("mock metrics unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsProvider for MockMetrics {
    async fn video_details(&self, video_id: &str) -> Result<Option<VideoDetails>> {
        self.begin_call()?;
        Ok(read(&self.videos).get(video_id).cloned())
    }

    async fn channel_details(&self, channel_id: &str) -> Result<Option<ChannelDetails>> {
        self.begin_call()?;
        Ok(read(&self.channels).get(channel_id).cloned())
    }

    async fn recent_videos(&self, channel_id: &str, limit: u32) -> Result<Vec<RecentVideo>> {
        self.begin_call()?;
        let mut uploads: Vec<VideoDetails> = read(&self.videos)
            .values()
            .filter(|v| v.channel_id == channel_id)
            .cloned()
            .collect();
        uploads.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(uploads
            .into_iter()
            .take(limit as usize)
            .map(|v| RecentVideo {
                video_id: v.video_id,
                title: v.title,
                description: v.description,
            })
            .collect())
    }
}

// ============================================================================
// Transcripts
// ============================================================================

#[derive(Default)]
pub struct MockTranscripts {
    transcripts: RwLock<HashMap<String, Transcript>>,
    failing: AtomicBool,
}

impl MockTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, video_id: &str, text: &str, language: Option<&str>) {
        write(&self.transcripts).insert(
            video_id.to_string(),
            Transcript {
                text: text.to_string(),
                language: language.map(str::to_string),
            },
        );
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TranscriptProvider for MockTranscripts {
    async fn fetch(&self, video_id: &str) -> Result<Option<Transcript>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::TransientExternal("mock transcripts unavailable".into()));
        }
        Ok(read(&self.transcripts).get(video_id).cloned())
    }
}

// ============================================================================
// Judge
// ============================================================================

pub struct MockJudge {
    reply: RwLock<String>,
    available: AtomicBool,
    call_count: AtomicU32,
}

impl MockJudge {
    pub fn new() -> Self {
        Self {
            reply: RwLock::new(APPROVING_REPLY.to_string()),
            available: AtomicBool::new(true),
            call_count: AtomicU32::new(0),
        }
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        *write(&self.reply) = reply.into();
        self
    }

    pub fn set_reply(&self, reply: impl Into<String>) {
        *write(&self.reply) = reply.into();
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmJudge for MockJudge {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(EngineError::TransientExternal("mock judge unavailable".into()));
        }
        Ok(read(&self.reply).clone())
    }
}
