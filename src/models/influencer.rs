//! Participant identity and channel binding

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EngineError, Result};

/// Where the channel verification code was found
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelVerificationMethod {
    ChannelDescription,
    VideoDescription,
    VideoTitle,
}

impl ChannelVerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChannelDescription => "channel_description",
            Self::VideoDescription => "video_description",
            Self::VideoTitle => "video_title",
        }
    }
}

/// A participant, identified by wallet address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Influencer {
    pub influencer_id: String,
    pub wallet_address: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub channel_verified: bool,
    #[serde(default)]
    pub verification_method: Option<ChannelVerificationMethod>,
    #[serde(default, skip_serializing)]
    pub verification_code: Option<String>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Influencer {
    /// Whether the profile carries the channel id and name
    pub fn has_required_fields(&self) -> bool {
        self.channel_id.as_deref().is_some_and(|c| !c.is_empty())
            && self.channel_name.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Whether this influencer may enter campaigns
    pub fn can_submit(&self) -> bool {
        self.channel_verified && self.has_required_fields()
    }
}

/// Canonical form of a wallet address
pub fn normalize_wallet(wallet: &str) -> String {
    wallet.trim().to_lowercase()
}

fn normalize_optional(value: Option<String>, lowercase: bool) -> Option<String> {
    value
        .map(|v| {
            let v = v.trim();
            if lowercase {
                v.to_lowercase()
            } else {
                v.to_string()
            }
        })
        .filter(|v| !v.is_empty())
}

/// Upsert request for an influencer profile
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub wallet_address: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfileUpdate {
    /// Trim fields, lower-case wallet and email, drop blanks
    pub fn normalized(self) -> Result<Self> {
        let wallet_address = normalize_wallet(&self.wallet_address);
        if wallet_address.is_empty() {
            return Err(EngineError::Validation("walletAddress is required".into()));
        }
        Ok(Self {
            wallet_address,
            channel_id: normalize_optional(self.channel_id, false),
            channel_name: normalize_optional(self.channel_name, false),
            email: normalize_optional(self.email, true),
        })
    }
}
