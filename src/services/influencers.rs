//! Influencer profiles and channel ownership
//!
//! A profile binds a wallet to a channel. Before an influencer may enter
//! campaigns they prove control of the channel by placing a code in the
//! channel description or in one of their most recent uploads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::metrics::MetricsProvider;
use crate::clock::Clock;
use crate::models::{normalize_wallet, ChannelVerificationMethod, Influencer, ProfileUpdate};
use crate::store::InfluencerStore;
use crate::types::{EngineError, Result};

/// Number of recent uploads searched for the verification code
pub const RECENT_VIDEOS_CHECKED: u32 = 5;

/// Result of a successful channel verification
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelVerification {
    pub verification_method: ChannelVerificationMethod,
    pub influencer: Influencer,
}

/// Whether an influencer may enter campaigns
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityReport {
    pub is_verified: bool,
    pub has_profile: bool,
    pub has_required_fields: bool,
    pub can_register: bool,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipReport {
    pub video_id: String,
    pub is_owner: bool,
    pub actual_channel_id: String,
    pub video_title: String,
}

pub struct InfluencerService {
    influencers: Arc<dyn InfluencerStore>,
    metrics: Arc<dyn MetricsProvider>,
    clock: Arc<dyn Clock>,
}

impl InfluencerService {
    pub fn new(
        influencers: Arc<dyn InfluencerStore>,
        metrics: Arc<dyn MetricsProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            influencers,
            metrics,
            clock,
        }
    }

    /// Create or update the profile keyed by wallet. Changing the channel
    /// of a verified profile clears its verification.
    pub async fn upsert_profile(&self, update: ProfileUpdate) -> Result<Influencer> {
        let update = update.normalized()?;
        let now = self.clock.now();

        if let Some(channel_id) = &update.channel_id {
            if let Some(other) = self.influencers.find_by_channel_id(channel_id).await? {
                if other.wallet_address != update.wallet_address {
                    return Err(EngineError::Validation(
                        "channel id is already registered to another influencer".into(),
                    ));
                }
            }
        }
        if let Some(email) = &update.email {
            if let Some(other) = self.influencers.find_by_email(email).await? {
                if other.wallet_address != update.wallet_address {
                    return Err(EngineError::Validation(
                        "email is already registered to another influencer".into(),
                    ));
                }
            }
        }

        let influencer = match self.influencers.get_by_wallet(&update.wallet_address).await? {
            Some(mut existing) => {
                if existing.channel_verified && existing.channel_id != update.channel_id {
                    info!(wallet = %existing.wallet_address, "Channel changed, verification cleared");
                    existing.channel_verified = false;
                    existing.verification_method = None;
                    existing.verification_code = None;
                    existing.verified_at = None;
                }
                existing.channel_id = update.channel_id;
                existing.channel_name = update.channel_name;
                existing.email = update.email;
                existing.updated_at = now;
                existing
            }
            None => Influencer {
                influencer_id: Uuid::new_v4().to_string(),
                wallet_address: update.wallet_address,
                channel_id: update.channel_id,
                channel_name: update.channel_name,
                email: update.email,
                channel_verified: false,
                verification_method: None,
                verification_code: None,
                verified_at: None,
                created_at: now,
                updated_at: now,
            },
        };

        self.influencers.save(&influencer).await?;
        Ok(influencer)
    }

    pub async fn get(&self, wallet_address: &str) -> Result<Influencer> {
        self.influencers
            .get_by_wallet(&normalize_wallet(wallet_address))
            .await?
            .ok_or_else(|| EngineError::NotFound("influencer profile".into()))
    }

    /// Search for `code` in the channel description, then in the titles and
    /// descriptions of recent uploads
    async fn find_code(&self, channel_id: &str, description: &str, code: &str) -> Option<ChannelVerificationMethod> {
        if description.contains(code) {
            return Some(ChannelVerificationMethod::ChannelDescription);
        }

        let recent = match self.metrics.recent_videos(channel_id, RECENT_VIDEOS_CHECKED).await {
            Ok(recent) => recent,
            Err(e) => {
                warn!(channel_id, error = %e, "Could not list recent videos");
                return None;
            }
        };

        for video in recent {
            // Search snippets truncate descriptions; use the full record
            let details = match self.metrics.video_details(&video.video_id).await {
                Ok(Some(d)) => d,
                Ok(None) => continue,
                Err(e) => {
                    warn!(video_id = %video.video_id, error = %e, "Could not load video");
                    return None;
                }
            };
            if details.description.contains(code) {
                return Some(ChannelVerificationMethod::VideoDescription);
            }
            if details.title.contains(code) {
                return Some(ChannelVerificationMethod::VideoTitle);
            }
        }
        None
    }

    /// Prove control of `channel_id` and mark the profile verified
    pub async fn verify_channel(
        &self,
        wallet_address: &str,
        channel_id: &str,
        code: &str,
    ) -> Result<ChannelVerification> {
        let code = code.trim();
        let channel_id = channel_id.trim();
        if code.is_empty() || channel_id.is_empty() {
            return Err(EngineError::Validation(
                "channel id and verification code are required".into(),
            ));
        }

        let mut influencer = self.get(wallet_address).await?;
        match influencer.channel_id.as_deref() {
            Some(registered) if registered != channel_id => {
                return Err(EngineError::OwnershipMismatch {
                    expected: registered.to_string(),
                    actual: channel_id.to_string(),
                });
            }
            Some(_) => {}
            None => {
                if let Some(other) = self.influencers.find_by_channel_id(channel_id).await? {
                    if other.wallet_address != influencer.wallet_address {
                        return Err(EngineError::Validation(
                            "channel id is already registered to another influencer".into(),
                        ));
                    }
                }
            }
        }

        let channel = self
            .metrics
            .channel_details(channel_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("channel {}", channel_id)))?;

        let method = self
            .find_code(channel_id, &channel.description, code)
            .await
            .ok_or_else(|| {
                EngineError::Validation(
                    "verification code not found in channel description or recent videos".into(),
                )
            })?;

        let now = self.clock.now();
        if influencer.channel_id.is_none() {
            influencer.channel_id = Some(channel_id.to_string());
        }
        if influencer.channel_name.is_none() && !channel.title.is_empty() {
            influencer.channel_name = Some(channel.title.clone());
        }
        influencer.channel_verified = true;
        influencer.verification_method = Some(method);
        influencer.verification_code = Some(code.to_string());
        influencer.verified_at = Some(now);
        influencer.updated_at = now;
        self.influencers.save(&influencer).await?;

        info!(
            wallet = %influencer.wallet_address,
            channel_id,
            method = method.as_str(),
            "Channel verified"
        );
        Ok(ChannelVerification {
            verification_method: method,
            influencer,
        })
    }

    pub async fn verification_status(&self, wallet_address: &str) -> Result<EligibilityReport> {
        let found = self
            .influencers
            .get_by_wallet(&normalize_wallet(wallet_address))
            .await?;

        Ok(match found {
            Some(i) => EligibilityReport {
                is_verified: i.channel_verified,
                has_profile: true,
                has_required_fields: i.has_required_fields(),
                can_register: i.can_submit(),
                channel_id: i.channel_id,
                channel_name: i.channel_name,
                verified_at: i.verified_at,
            },
            None => EligibilityReport {
                is_verified: false,
                has_profile: false,
                has_required_fields: false,
                can_register: false,
                channel_id: None,
                channel_name: None,
                verified_at: None,
            },
        })
    }

    pub async fn verify_video_ownership(
        &self,
        video_id: &str,
        expected_channel_id: &str,
    ) -> Result<OwnershipReport> {
        let video = self
            .metrics
            .video_details(video_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("video {}", video_id)))?;

        Ok(OwnershipReport {
            video_id: video_id.to_string(),
            is_owner: video.channel_id == expected_channel_id,
            actual_channel_id: video.channel_id,
            video_title: video.title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::models::VideoStats;
    use crate::services::metrics::{ChannelDetails, RecentVideo, VideoDetails};
    use crate::store::InMemoryInfluencerStore;
    use async_trait::async_trait;

    struct FakeMetrics {
        channel_description: String,
        videos: Vec<(String, String, String)>,
    }

    #[async_trait]
    impl MetricsProvider for FakeMetrics {
        async fn video_details(&self, video_id: &str) -> Result<Option<VideoDetails>> {
            Ok(self
                .videos
                .iter()
                .find(|(id, _, _)| id == video_id)
                .map(|(id, title, description)| VideoDetails {
                    video_id: id.clone(),
                    channel_id: "UC1".into(),
                    title: title.clone(),
                    description: description.clone(),
                    published_at: Utc::now(),
                    duration_seconds: 60,
                    stats: VideoStats::default(),
                }))
        }

        async fn channel_details(&self, channel_id: &str) -> Result<Option<ChannelDetails>> {
            Ok((channel_id == "UC1").then(|| ChannelDetails {
                channel_id: channel_id.into(),
                title: "Creator".into(),
                description: self.channel_description.clone(),
            }))
        }

        async fn recent_videos(&self, _channel_id: &str, _limit: u32) -> Result<Vec<RecentVideo>> {
            Ok(self
                .videos
                .iter()
                .map(|(id, title, _)| RecentVideo {
                    video_id: id.clone(),
                    title: title.clone(),
                    description: String::new(),
                })
                .collect())
        }
    }

    fn service(channel_description: &str, videos: Vec<(&str, &str, &str)>) -> InfluencerService {
        let metrics = FakeMetrics {
            channel_description: channel_description.into(),
            videos: videos
                .into_iter()
                .map(|(a, b, c)| (a.to_string(), b.to_string(), c.to_string()))
                .collect(),
        };
        InfluencerService::new(
            Arc::new(InMemoryInfluencerStore::new()),
            Arc::new(metrics),
            Arc::new(SystemClock),
        )
    }

    fn profile(wallet: &str, channel: Option<&str>, email: Option<&str>) -> ProfileUpdate {
        ProfileUpdate {
            wallet_address: wallet.into(),
            channel_id: channel.map(str::to_string),
            channel_name: channel.map(|_| "Creator".to_string()),
            email: email.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_unique() {
        let svc = service("", vec![]);
        let a = svc.upsert_profile(profile("0xAAA", Some("UC1"), Some("a@x.io"))).await.unwrap();
        let again = svc.upsert_profile(profile("0xaaa", Some("UC1"), Some("A@X.io"))).await.unwrap();
        assert_eq!(a.influencer_id, again.influencer_id);
        assert_eq!(again.wallet_address, "0xaaa");

        assert!(matches!(
            svc.upsert_profile(profile("0xbbb", Some("UC1"), None)).await,
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            svc.upsert_profile(profile("0xbbb", Some("UC2"), Some("a@x.io"))).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_via_channel_description() {
        let svc = service("Business: CODE-123", vec![]);
        svc.upsert_profile(profile("0xaaa", Some("UC1"), None)).await.unwrap();

        let result = svc.verify_channel("0xAAA", "UC1", "CODE-123").await.unwrap();
        assert_eq!(result.verification_method, ChannelVerificationMethod::ChannelDescription);
        assert!(result.influencer.can_submit());

        let status = svc.verification_status("0xaaa").await.unwrap();
        assert!(status.can_register);
        assert!(status.verified_at.is_some());
    }

    #[tokio::test]
    async fn test_verify_via_recent_video() {
        let svc = service(
            "nothing here",
            vec![
                ("v1", "Daily vlog", "no code"),
                ("v2", "Unboxing CODE-9", "see title"),
            ],
        );
        svc.upsert_profile(profile("0xaaa", Some("UC1"), None)).await.unwrap();

        let result = svc.verify_channel("0xaaa", "UC1", "CODE-9").await.unwrap();
        assert_eq!(result.verification_method, ChannelVerificationMethod::VideoTitle);
    }

    #[tokio::test]
    async fn test_verify_failures() {
        let svc = service("nothing", vec![("v1", "vlog", "desc")]);
        svc.upsert_profile(profile("0xaaa", Some("UC1"), None)).await.unwrap();

        assert!(matches!(
            svc.verify_channel("0xaaa", "UC1", "MISSING").await,
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            svc.verify_channel("0xaaa", "UC9", "MISSING").await,
            Err(EngineError::OwnershipMismatch { .. })
        ));
        assert!(matches!(
            svc.verify_channel("0xnobody", "UC1", "X").await,
            Err(EngineError::NotFound(_))
        ));
        assert!(!svc.verification_status("0xaaa").await.unwrap().is_verified);
        assert!(!svc.verification_status("0xnobody").await.unwrap().has_profile);
    }

    #[tokio::test]
    async fn test_channel_change_clears_verification() {
        let svc = service("CODE", vec![]);
        svc.upsert_profile(profile("0xaaa", Some("UC1"), None)).await.unwrap();
        svc.verify_channel("0xaaa", "UC1", "CODE").await.unwrap();

        let updated = svc.upsert_profile(profile("0xaaa", Some("UC2"), None)).await.unwrap();
        assert!(!updated.channel_verified);
        assert!(updated.verification_method.is_none());
    }

    #[tokio::test]
    async fn test_video_ownership() {
        let svc = service("", vec![("v1", "vlog", "")]);
        assert!(svc.verify_video_ownership("v1", "UC1").await.unwrap().is_owner);
        assert!(!svc.verify_video_ownership("v1", "UC2").await.unwrap().is_owner);
        assert!(matches!(
            svc.verify_video_ownership("v9", "UC1").await,
            Err(EngineError::NotFound(_))
        ));
    }
}
