//! Transcript provider
//!
//! Fetches the spoken text of a video for content verification. The
//! Supadata transcript endpoint returns either plain text or a list of
//! segments plus the detected language.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::types::{EngineError, Result};

/// Usable transcript text with its language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
}

#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// `Ok(None)` when the video has no usable transcript
    async fn fetch(&self, video_id: &str) -> Result<Option<Transcript>>;
}

/// Reduce a transcript payload to text. Segment lists are joined with
/// spaces; empty strings and empty lists yield `None`.
pub fn transcript_from_payload(payload: &Value) -> Option<Transcript> {
    let text = match payload.get("content")? {
        Value::String(s) => s.clone(),
        Value::Array(segments) => segments
            .iter()
            .filter_map(|segment| match segment {
                Value::String(s) => Some(s.clone()),
                other => other.get("text").and_then(Value::as_str).map(str::to_string),
            })
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };

    if text.trim().is_empty() {
        return None;
    }

    Some(Transcript {
        text,
        language: payload
            .get("lang")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Supadata transcript API client
pub struct SupadataClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl SupadataClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("campayn/0.1")
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http_client,
        }
    }
}

#[async_trait]
impl TranscriptProvider for SupadataClient {
    async fn fetch(&self, video_id: &str) -> Result<Option<Transcript>> {
        let url = format!("{}/transcript", self.base_url.trim_end_matches('/'));
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);

        let response = self
            .http_client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .query(&[("url", video_url.as_str()), ("text", "true"), ("mode", "auto")])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(video_id, "No transcript available");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(EngineError::TransientExternal(format!(
                "transcript provider returned HTTP {}",
                status
            )));
        }

        let payload: Value = response.json().await?;
        let transcript = transcript_from_payload(&payload);
        debug!(
            video_id,
            found = transcript.is_some(),
            language = ?transcript.as_ref().and_then(|t| t.language.as_deref()),
            "Transcript fetched"
        );
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_content() {
        let t = transcript_from_payload(&json!({"content": "hello acme", "lang": "en"})).unwrap();
        assert_eq!(t.text, "hello acme");
        assert_eq!(t.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_segment_content_joined() {
        let t = transcript_from_payload(&json!({
            "content": [{"text": "try", "offset": 0}, {"text": "acme", "offset": 900}, "today"]
        }))
        .unwrap();
        assert_eq!(t.text, "try acme today");
        assert_eq!(t.language, None);
    }

    #[test]
    fn test_empty_content_is_absent() {
        assert!(transcript_from_payload(&json!({"content": "   "})).is_none());
        assert!(transcript_from_payload(&json!({"content": []})).is_none());
        assert!(transcript_from_payload(&json!({"lang": "en"})).is_none());
        assert!(transcript_from_payload(&json!({"content": null})).is_none());
    }
}
