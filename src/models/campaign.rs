//! Campaign metadata and verification configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EngineError, Result};

/// Lower bound for the promotional word-count requirement
pub const MIN_WORD_COUNT: u32 = 10;
/// Upper bound for the promotional word-count requirement
pub const MAX_WORD_COUNT: u32 = 1000;

fn default_true() -> bool {
    true
}

fn default_minimum_word_count() -> u32 {
    50
}

/// Per-campaign settings for automated content verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_minimum_word_count")]
    pub minimum_word_count: u32,
    #[serde(default)]
    pub required_keywords: Vec<String>,
    #[serde(default)]
    pub strict_mode: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_word_count: default_minimum_word_count(),
            required_keywords: Vec::new(),
            strict_mode: false,
        }
    }
}

impl VerificationConfig {
    /// Check bounds and normalize keywords
    pub fn normalized(mut self) -> Result<Self> {
        if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&self.minimum_word_count) {
            return Err(EngineError::Validation(format!(
                "minimumWordCount must be between {} and {}, got {}",
                MIN_WORD_COUNT, MAX_WORD_COUNT, self.minimum_word_count
            )));
        }
        self.required_keywords = self
            .required_keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Ok(self)
    }
}

/// A sponsor-funded contest, keyed by its ledger id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub campaign_id: u64,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub verification: VerificationConfig,
    pub created_at: DateTime<Utc>,
}

/// Request body for registering a campaign after its ledger transaction
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub campaign_id: u64,
    pub title: String,
    pub description: String,
    pub requirements: String,
    #[serde(default)]
    pub verification: Option<VerificationConfig>,
}

impl NewCampaign {
    /// Validate the request and build the campaign record
    pub fn into_campaign(self, created_at: DateTime<Utc>) -> Result<Campaign> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(EngineError::Validation("title is required".into()));
        }
        if self.description.trim().is_empty() {
            return Err(EngineError::Validation("description is required".into()));
        }
        if self.requirements.trim().is_empty() {
            return Err(EngineError::Validation("requirements are required".into()));
        }

        Ok(Campaign {
            campaign_id: self.campaign_id,
            title,
            description: self.description,
            requirements: self.requirements,
            verification: self.verification.unwrap_or_default().normalized()?,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(config: Option<VerificationConfig>) -> NewCampaign {
        NewCampaign {
            campaign_id: 7,
            title: "  Launch week ".into(),
            description: "Promote the launch".into(),
            requirements: "Mention Acme for 30 seconds".into(),
            verification: config,
        }
    }

    #[test]
    fn test_defaults_applied() {
        let campaign = request(None).into_campaign(Utc::now()).unwrap();
        assert_eq!(campaign.title, "Launch week");
        assert!(campaign.verification.enabled);
        assert_eq!(campaign.verification.minimum_word_count, 50);
        assert!(!campaign.verification.strict_mode);
    }

    #[test]
    fn test_word_count_bounds() {
        for bad in [0, 9, 1001] {
            let config = VerificationConfig {
                minimum_word_count: bad,
                ..Default::default()
            };
            assert!(matches!(
                request(Some(config)).into_campaign(Utc::now()),
                Err(EngineError::Validation(_))
            ));
        }
        for ok in [MIN_WORD_COUNT, MAX_WORD_COUNT] {
            let config = VerificationConfig {
                minimum_word_count: ok,
                ..Default::default()
            };
            assert!(request(Some(config)).into_campaign(Utc::now()).is_ok());
        }
    }

    #[test]
    fn test_keywords_trimmed() {
        let config = VerificationConfig {
            required_keywords: vec![" acme ".into(), "  ".into(), "rocket".into()],
            ..Default::default()
        };
        let campaign = request(Some(config)).into_campaign(Utc::now()).unwrap();
        assert_eq!(campaign.verification.required_keywords, vec!["acme", "rocket"]);
    }

    #[test]
    fn test_config_deserializes_partial() {
        let config: VerificationConfig =
            serde_json::from_str(r#"{"strictMode": true}"#).unwrap();
        assert!(config.enabled);
        assert!(config.strict_mode);
        assert_eq!(config.minimum_word_count, 50);
    }
}
