//! Settlement ledger
//!
//! The escrow contract owns campaign funds and settlement state. The
//! scheduler reads that state and drives `settle` / `recover_escrow`
//! through the [`Ledger`] trait.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Result;

pub use http::HttpLedger;
pub use memory::{InMemoryLedger, LedgerCall};

/// Default wait after campaign end before an empty campaign's escrow is
/// returned to the sponsor
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 7;

/// Percentage of the pool paid to ranks 1, 2 and 3
pub const REWARD_SHARES_PERCENT: [u128; 3] = [50, 30, 20];

/// Maximum number of paid ranks
pub const MAX_WINNERS: usize = REWARD_SHARES_PERCENT.len();

pub fn grace_period(days: i64) -> Duration {
    Duration::days(days)
}

/// Per-rank payouts in base units for `winners` filled ranks.
///
/// Unfilled ranks are not redistributed. Exact floor of `total * pct / 100`
/// for every pool up to `u128::MAX`.
pub fn reward_shares(total_reward: u128, winners: usize) -> Vec<u128> {
    REWARD_SHARES_PERCENT
        .iter()
        .take(winners)
        .map(|pct| total_reward / 100 * pct + total_reward % 100 * pct / 100)
        .collect()
}

/// Serialize base-unit amounts as decimal strings; accept strings or numbers
mod amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
            Raw::Number(n) => Ok(u128::from(n)),
        }
    }
}

/// Escrow state of one campaign as held by the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementState {
    pub campaign_id: u64,
    pub sponsor: String,
    #[serde(with = "amount")]
    pub total_reward: u128,
    pub registration_end: DateTime<Utc>,
    pub campaign_end: DateTime<Utc>,
    pub is_active: bool,
    pub is_completed: bool,
    #[serde(default)]
    pub participant_count: u64,
}

/// Handle of a submitted ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: String,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Ids of campaigns that are still active on the ledger
    async fn list_active_campaigns(&self) -> Result<Vec<u64>>;

    async fn settlement_state(&self, campaign_id: u64) -> Result<SettlementState>;

    /// Pay the ranked winners. `submission_times` are unix seconds, one per
    /// winner.
    async fn settle(
        &self,
        campaign_id: u64,
        winners: &[String],
        submission_times: &[i64],
    ) -> Result<TxReceipt>;

    /// Return the escrow of a campaign nobody entered to its sponsor
    async fn recover_escrow(&self, campaign_id: u64) -> Result<TxReceipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_shares() {
        assert_eq!(reward_shares(10, 1), vec![5]);
        assert_eq!(reward_shares(1_000, 2), vec![500, 300]);
        assert_eq!(reward_shares(1_000, 3), vec![500, 300, 200]);
        assert_eq!(reward_shares(1_000, 7), vec![500, 300, 200]);
        assert!(reward_shares(1_000, 0).is_empty());
        assert_eq!(reward_shares(99, 3), vec![49, 29, 19]);
    }

    #[test]
    fn test_reward_shares_large_pool() {
        let shares = reward_shares(u128::MAX, 3);
        assert_eq!(shares[0], u128::MAX / 2);
        assert_eq!(shares[1], u128::MAX / 10 * 3 + u128::MAX % 10 * 3 / 10);
        assert_eq!(shares[2], u128::MAX / 5);
        assert!(shares.iter().sum::<u128>() <= u128::MAX);

        assert_eq!(reward_shares(u128::MAX / 10, 1), vec![u128::MAX / 20]);
    }

    #[test]
    fn test_state_amount_formats() {
        let json = r#"{
            "campaignId": 3,
            "sponsor": "0xsponsor",
            "totalReward": "340282366920938463463374607431768211455",
            "registrationEnd": "2025-01-01T00:00:00Z",
            "campaignEnd": "2025-01-08T00:00:00Z",
            "isActive": true,
            "isCompleted": false
        }"#;
        let state: SettlementState = serde_json::from_str(json).unwrap();
        assert_eq!(state.total_reward, u128::MAX);
        assert_eq!(state.participant_count, 0);

        let numeric = json.replace(
            "\"340282366920938463463374607431768211455\"",
            "1000000",
        );
        let state: SettlementState = serde_json::from_str(&numeric).unwrap();
        assert_eq!(state.total_reward, 1_000_000);

        let out = serde_json::to_value(&state).unwrap();
        assert_eq!(out["totalReward"], "1000000");
    }
}
