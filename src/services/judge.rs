//! LLM judge
//!
//! Builds the verification prompt, sends it to the model and turns the
//! free-text reply into a structured verdict.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::{Campaign, RequirementsChecklist, VerificationErrorCode};
use crate::types::{EngineError, Result};

/// Model used when none is configured
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

#[async_trait]
pub trait LlmJudge: Send + Sync {
    /// Send `prompt` and return the model's raw text reply
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Parsed judge reply
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub approved: bool,
    pub confidence: Option<u8>,
    pub reason: Option<String>,
    pub brand_mentions: Vec<String>,
    pub promotional_segment_word_count: u32,
    pub meets_requirements: RequirementsChecklist,
}

/// Render the verification prompt for one transcript
pub fn build_prompt(campaign: &Campaign, transcript: &str) -> String {
    let config = &campaign.verification;
    let keywords = if config.required_keywords.is_empty() {
        "none".to_string()
    } else {
        config.required_keywords.join(", ")
    };
    let strictness = if config.strict_mode {
        "STRICT: every requirement and every required keyword must be satisfied."
    } else {
        "LENIENT: a brief 30-60 second mention in a longer video is acceptable if it covers the main points."
    };

    format!(
        r#"You are a content moderator for a marketing campaign platform. Decide whether the video transcript below satisfies the campaign requirements.

CAMPAIGN DETAILS:
- Title: {title}
- Description: {description}
- Requirements: {requirements}
- Minimum promotional word count: {min_words}
- Required keywords: {keywords}
- Mode: {strictness}

VIDEO TRANSCRIPT:
{transcript}

ANALYSIS CRITERIA:
1. The creator mentions the brand, product or service named in the campaign
2. The creator follows the campaign requirements
3. The promotional segment contains at least {min_words} words
4. The content is relevant to the campaign objectives

Respond with ONLY a valid JSON object in this exact format:
{{
  "approved": boolean,
  "confidence": number (0-100),
  "reason": "explanation of the decision",
  "brandMentions": ["detected brand or product mentions"],
  "promotionalSegmentWordCount": number,
  "meetsRequirements": {{
    "mentionsBrand": boolean,
    "followsGuidelines": boolean,
    "adequateWordCount": boolean
  }}
}}"#,
        title = campaign.title,
        description = campaign.description,
        requirements = campaign.requirements,
        min_words = config.minimum_word_count,
        keywords = keywords,
        strictness = strictness,
        transcript = transcript,
    )
}

/// Parse the first `{...}` block of a reply into a verdict.
///
/// Unusable replies fail with `VerificationProcessing` carrying
/// `INVALID_VERDICT`.
pub fn parse_verdict(reply: &str) -> Result<JudgeVerdict> {
    read_verdict(reply).map_err(|message| EngineError::VerificationProcessing {
        code: VerificationErrorCode::InvalidVerdict.as_str().to_string(),
        message,
    })
}

fn read_verdict(reply: &str) -> std::result::Result<JudgeVerdict, String> {
    let start = reply.find('{').ok_or("no JSON object in judge reply")?;
    let end = reply.rfind('}').ok_or("no JSON object in judge reply")?;
    if end < start {
        return Err("no JSON object in judge reply".into());
    }

    let value: Value = serde_json::from_str(&reply[start..=end])
        .map_err(|e| format!("judge reply is not valid JSON: {}", e))?;

    let approved = value
        .get("approved")
        .and_then(Value::as_bool)
        .ok_or("judge reply is missing a boolean \"approved\"")?;

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 100.0).round() as u8);

    let brand_mentions = value
        .get("brandMentions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let promotional_segment_word_count = value
        .get("promotionalSegmentWordCount")
        .and_then(Value::as_f64)
        .map(|n| n.max(0.0).round().min(u32::MAX as f64) as u32)
        .unwrap_or(0);

    let checklist = value.get("meetsRequirements");
    let flag = |key: &str| {
        checklist
            .and_then(|c| c.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    Ok(JudgeVerdict {
        approved,
        confidence,
        reason: value
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string),
        brand_mentions,
        promotional_segment_word_count,
        meets_requirements: RequirementsChecklist {
            mentions_brand: flag("mentionsBrand"),
            follows_guidelines: flag("followsGuidelines"),
            adequate_word_count: flag("adequateWordCount"),
        },
    })
}

// ============================================================================
// Gemini
// ============================================================================

/// Google Gemini `generateContent` client
pub struct GeminiJudge {
    base_url: String,
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl GeminiJudge {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("campayn/0.1")
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            http_client,
        }
    }
}

#[async_trait]
impl LlmJudge for GeminiJudge {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::TransientExternal(format!(
                "judge returned HTTP {}",
                status
            )));
        }

        let payload: Value = response.json().await?;
        let text = payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(text)
    }
}
