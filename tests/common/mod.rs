//! Shared wiring for the end-to-end tests

#![allow(dead_code)]

use std::sync::Arc;

use campayn::clock::{Clock, ManualClock};
use campayn::config::Args;
use campayn::ledger::InMemoryLedger;
use campayn::models::{NewCampaign, ProfileUpdate, VideoStats};
use campayn::services::metrics::{ChannelDetails, VideoDetails};
use campayn::services::{MockJudge, MockMetrics, MockTranscripts};
use campayn::store::{InMemoryCampaignStore, InMemoryInfluencerStore, InMemorySubmissionStore};
use campayn::{AppState, Backends};
use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;

pub struct World {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<InMemoryLedger>,
    pub metrics: Arc<MockMetrics>,
    pub transcripts: Arc<MockTranscripts>,
    pub judge: Arc<MockJudge>,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn world() -> World {
    let clock = Arc::new(ManualClock::new(t0()));
    let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
    let metrics = Arc::new(MockMetrics::new());
    let transcripts = Arc::new(MockTranscripts::new());
    let judge = Arc::new(MockJudge::new());

    let args = Args::try_parse_from(["campayn", "--dev-mode"]).unwrap();
    let state = Arc::new(AppState::new(
        args,
        Backends {
            campaigns: Arc::new(InMemoryCampaignStore::new()),
            influencers: Arc::new(InMemoryInfluencerStore::new()),
            submissions: Arc::new(InMemorySubmissionStore::new()),
            metrics: metrics.clone(),
            transcripts: transcripts.clone(),
            judge: judge.clone(),
            ledger: ledger.clone(),
            clock: clock.clone(),
        },
    ));

    World {
        state,
        clock,
        ledger,
        metrics,
        transcripts,
        judge,
    }
}

impl World {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn campaign(&self, campaign_id: u64) {
        self.state
            .campaigns
            .create(NewCampaign {
                campaign_id,
                title: "Acme launch".into(),
                description: "Show off the new rocket".into(),
                requirements: "Mention Acme for at least 30 seconds".into(),
                verification: None,
            })
            .await
            .unwrap();
    }

    /// Register a profile and verify its channel through the channel description
    pub async fn verified_influencer(&self, wallet: &str, channel_id: &str) {
        self.state
            .influencers
            .upsert_profile(ProfileUpdate {
                wallet_address: wallet.into(),
                channel_id: Some(channel_id.into()),
                channel_name: Some(format!("{} channel", wallet)),
                email: None,
            })
            .await
            .unwrap();

        let code = format!("CAMPAYN-{}", wallet);
        self.metrics.add_channel(ChannelDetails {
            channel_id: channel_id.into(),
            title: format!("{} channel", wallet),
            description: format!("Official channel. {}", code),
        });
        self.state
            .influencers
            .verify_channel(wallet, channel_id, &code)
            .await
            .unwrap();
    }

    pub fn video(&self, video_id: &str, channel_id: &str, views: u64) {
        self.metrics.add_video(VideoDetails {
            video_id: video_id.into(),
            channel_id: channel_id.into(),
            title: "Flying with Acme".into(),
            description: String::new(),
            published_at: self.now(),
            duration_seconds: 90,
            stats: VideoStats {
                view_count: views,
                like_count: views / 20,
                comment_count: views / 100,
            },
        });
    }

    /// Wait for detached verification jobs to finish
    pub async fn drain(&self) {
        while self.state.queue.in_flight() > 0 {
            tokio::task::yield_now().await;
        }
    }
}
