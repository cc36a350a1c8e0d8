//! Ledger adapter talking to a JSON relayer over HTTP

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{debug, info};

use super::{Ledger, SettlementState, TxReceipt};
use crate::types::{EngineError, Result};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveCampaigns {
    campaign_ids: Vec<u64>,
}

/// Relayer client. The relayer holds the signing key and submits the
/// contract calls.
pub struct HttpLedger {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpLedger {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("campayn/0.1")
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Ledger(format!(
                "{} failed with HTTP {}: {}",
                what, status, body
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::Ledger(format!("{} returned invalid body: {}", what, e)))
    }

    async fn post(&self, path: &str, body: serde_json::Value, what: &str) -> Result<TxReceipt> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Ledger(format!("{} request failed: {}", what, e)))?;
        Self::decode(response, what).await
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn list_active_campaigns(&self) -> Result<Vec<u64>> {
        let response = self
            .http_client
            .get(format!("{}/campaigns/active", self.base_url))
            .send()
            .await
            .map_err(|e| EngineError::Ledger(format!("list active campaigns: {}", e)))?;
        let active: ActiveCampaigns = Self::decode(response, "list active campaigns").await?;
        debug!(count = active.campaign_ids.len(), "Active campaigns listed");
        Ok(active.campaign_ids)
    }

    async fn settlement_state(&self, campaign_id: u64) -> Result<SettlementState> {
        let response = self
            .http_client
            .get(format!("{}/campaigns/{}", self.base_url, campaign_id))
            .send()
            .await
            .map_err(|e| EngineError::Ledger(format!("campaign {} state: {}", campaign_id, e)))?;
        Self::decode(response, "settlement state").await
    }

    async fn settle(
        &self,
        campaign_id: u64,
        winners: &[String],
        submission_times: &[i64],
    ) -> Result<TxReceipt> {
        let receipt = self
            .post(
                &format!("/campaigns/{}/settle", campaign_id),
                json!({ "winners": winners, "submissionTimes": submission_times }),
                "settle",
            )
            .await?;
        info!(campaign_id, tx = %receipt.tx_hash, "Settlement submitted");
        Ok(receipt)
    }

    async fn recover_escrow(&self, campaign_id: u64) -> Result<TxReceipt> {
        let receipt = self
            .post(
                &format!("/campaigns/{}/recover", campaign_id),
                json!({}),
                "recover escrow",
            )
            .await?;
        info!(campaign_id, tx = %receipt.tx_hash, "Escrow recovery submitted");
        Ok(receipt)
    }
}
