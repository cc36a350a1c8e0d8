//! In-process ledger for dev mode and tests
//!
//! Mirrors the escrow contract's rules: settlement only after the campaign
//! end, at most once, paying 50/30/20 by rank; recovery only for campaigns
//! without participants once the grace period has passed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    grace_period, reward_shares, Ledger, SettlementState, TxReceipt, DEFAULT_GRACE_PERIOD_DAYS,
    MAX_WINNERS,
};
use crate::clock::Clock;
use crate::types::{EngineError, Result};

/// A state-changing call received by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Settle {
        campaign_id: u64,
        winners: Vec<String>,
        submission_times: Vec<i64>,
    },
    RecoverEscrow {
        campaign_id: u64,
    },
}

#[derive(Default)]
struct LedgerInner {
    campaigns: HashMap<u64, SettlementState>,
    /// Paid-out base units per address
    balances: HashMap<String, u128>,
    calls: Vec<LedgerCall>,
}

pub struct InMemoryLedger {
    clock: Arc<dyn Clock>,
    grace_days: i64,
    inner: RwLock<LedgerInner>,
}

impl InMemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            grace_days: DEFAULT_GRACE_PERIOD_DAYS,
            inner: RwLock::new(LedgerInner::default()),
        }
    }

    pub fn with_grace_days(mut self, days: i64) -> Self {
        self.grace_days = days;
        self
    }

    /// Open an escrowed campaign
    pub async fn open_campaign(&self, state: SettlementState) {
        self.inner
            .write()
            .await
            .campaigns
            .insert(state.campaign_id, state);
    }

    /// Count a registered participant
    pub async fn register_participant(&self, campaign_id: u64) -> Result<()> {
        let mut inner = self.inner.write().await;
        let state = inner
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| EngineError::Ledger(format!("unknown campaign {}", campaign_id)))?;
        state.participant_count += 1;
        Ok(())
    }

    pub async fn balance_of(&self, address: &str) -> u128 {
        self.inner
            .read()
            .await
            .balances
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub async fn calls(&self) -> Vec<LedgerCall> {
        self.inner.read().await.calls.clone()
    }
}

fn tx_hash() -> String {
    format!("0x{}", Uuid::new_v4().simple())
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn list_active_campaigns(&self) -> Result<Vec<u64>> {
        let mut ids: Vec<u64> = self
            .inner
            .read()
            .await
            .campaigns
            .values()
            .filter(|s| s.is_active)
            .map(|s| s.campaign_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn settlement_state(&self, campaign_id: u64) -> Result<SettlementState> {
        self.inner
            .read()
            .await
            .campaigns
            .get(&campaign_id)
            .cloned()
            .ok_or_else(|| EngineError::Ledger(format!("unknown campaign {}", campaign_id)))
    }

    async fn settle(
        &self,
        campaign_id: u64,
        winners: &[String],
        submission_times: &[i64],
    ) -> Result<TxReceipt> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;
        inner.calls.push(LedgerCall::Settle {
            campaign_id,
            winners: winners.to_vec(),
            submission_times: submission_times.to_vec(),
        });

        let state = inner
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| EngineError::Ledger(format!("unknown campaign {}", campaign_id)))?;
        if state.is_completed {
            return Err(EngineError::Ledger(format!(
                "campaign {} already completed",
                campaign_id
            )));
        }
        if now < state.campaign_end {
            return Err(EngineError::Ledger(format!(
                "campaign {} has not ended",
                campaign_id
            )));
        }
        if winners.is_empty() || winners.len() > MAX_WINNERS {
            return Err(EngineError::Ledger(format!(
                "invalid winner count {}",
                winners.len()
            )));
        }
        if winners.len() != submission_times.len() {
            return Err(EngineError::Ledger(
                "winners and submission times differ in length".into(),
            ));
        }

        let shares = reward_shares(state.total_reward, winners.len());
        state.is_completed = true;
        state.is_active = false;

        for (winner, share) in winners.iter().zip(shares) {
            *inner.balances.entry(winner.clone()).or_insert(0) += share;
        }
        Ok(TxReceipt { tx_hash: tx_hash() })
    }

    async fn recover_escrow(&self, campaign_id: u64) -> Result<TxReceipt> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;
        inner.calls.push(LedgerCall::RecoverEscrow { campaign_id });

        let state = inner
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| EngineError::Ledger(format!("unknown campaign {}", campaign_id)))?;
        if state.is_completed {
            return Err(EngineError::Ledger(format!(
                "campaign {} already completed",
                campaign_id
            )));
        }
        if state.participant_count > 0 {
            return Err(EngineError::Ledger(format!(
                "campaign {} has participants",
                campaign_id
            )));
        }
        if now < state.campaign_end + grace_period(self.grace_days) {
            return Err(EngineError::Ledger(format!(
                "campaign {} is still within its grace period",
                campaign_id
            )));
        }

        state.is_completed = true;
        state.is_active = false;
        let sponsor = state.sponsor.clone();
        let refund = state.total_reward;
        *inner.balances.entry(sponsor).or_insert(0) += refund;
        Ok(TxReceipt { tx_hash: tx_hash() })
    }
}
