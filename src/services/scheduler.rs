//! Settlement scheduler
//!
//! Two recurring cadences: refreshing stale analytics, and completing
//! ended campaigns on the ledger. A tick that fires while the previous
//! tick of the same cadence is still running is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::submissions::SubmissionRegistry;
use crate::clock::Clock;
use crate::ledger::{grace_period, reward_shares, Ledger, DEFAULT_GRACE_PERIOD_DAYS, MAX_WINNERS};
use crate::types::Result;

/// Cadences and thresholds
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub refresh_every: Duration,
    pub completion_every: Duration,
    /// Analytics older than this are refreshed
    pub stale_after: chrono::Duration,
    /// Wait after campaign end before an empty campaign is recovered
    pub grace: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_every: Duration::from_secs(2 * 60 * 60),
            completion_every: Duration::from_secs(60 * 60),
            stale_after: chrono::Duration::hours(1),
            grace: grace_period(DEFAULT_GRACE_PERIOD_DAYS),
        }
    }
}

/// What a completion tick did with one campaign
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CampaignOutcome {
    NotEnded,
    AlreadyCompleted,
    #[serde(rename_all = "camelCase")]
    Settled {
        winners: Vec<String>,
        #[serde(serialize_with = "serialize_amounts")]
        shares: Vec<u128>,
        tx_hash: String,
    },
    #[serde(rename_all = "camelCase")]
    AwaitingGrace { recoverable_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    Recovered { tx_hash: String },
    Failed { error: String },
}

fn serialize_amounts<S: serde::Serializer>(
    amounts: &[u128],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(amounts.iter().map(|a| a.to_string()))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignReport {
    pub campaign_id: u64,
    #[serde(flatten)]
    pub outcome: CampaignOutcome,
}

/// Result of one completion tick
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub started_at: Option<DateTime<Utc>>,
    pub campaigns: Vec<CampaignReport>,
}

impl TickReport {
    pub fn outcome(&self, campaign_id: u64) -> Option<&CampaignOutcome> {
        self.campaigns
            .iter()
            .find(|c| c.campaign_id == campaign_id)
            .map(|c| &c.outcome)
    }
}

/// Holds a cadence's running flag until dropped
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SettlementScheduler {
    registry: Arc<SubmissionRegistry>,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    refresh_running: AtomicBool,
    completion_running: AtomicBool,
}

impl SettlementScheduler {
    pub fn new(
        registry: Arc<SubmissionRegistry>,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            clock,
            config,
            refresh_running: AtomicBool::new(false),
            completion_running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Refresh stale analytics. `None` when a refresh is already running.
    pub async fn run_refresh_tick(&self) -> Result<Option<usize>> {
        let Some(_guard) = TickGuard::acquire(&self.refresh_running) else {
            warn!("Analytics refresh still running, tick skipped");
            return Ok(None);
        };
        let refreshed = self.registry.refresh_stale(self.config.stale_after).await?;
        Ok(Some(refreshed))
    }

    /// Settle or recover every active campaign that has ended. `None` when
    /// a completion tick is already running.
    pub async fn run_completion_tick(&self) -> Result<Option<TickReport>> {
        let Some(_guard) = TickGuard::acquire(&self.completion_running) else {
            warn!("Completion check still running, tick skipped");
            return Ok(None);
        };

        let started_at = self.clock.now();
        let active = self.ledger.list_active_campaigns().await?;
        debug!(count = active.len(), "Active campaigns");

        let mut report = TickReport {
            started_at: Some(started_at),
            campaigns: Vec::with_capacity(active.len()),
        };
        for campaign_id in active {
            let outcome = match self.complete_campaign(campaign_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(campaign_id, error = %e, "Campaign completion failed");
                    CampaignOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.campaigns.push(CampaignReport {
                campaign_id,
                outcome,
            });
        }

        info!(campaigns = report.campaigns.len(), "Completion check finished");
        Ok(Some(report))
    }

    async fn complete_campaign(&self, campaign_id: u64) -> Result<CampaignOutcome> {
        let state = self.ledger.settlement_state(campaign_id).await?;
        if state.is_completed {
            return Ok(CampaignOutcome::AlreadyCompleted);
        }
        let now = self.clock.now();
        if now < state.campaign_end {
            return Ok(CampaignOutcome::NotEnded);
        }

        let ranked = self.registry.ranked(campaign_id, Some(MAX_WINNERS)).await?;

        if ranked.is_empty() {
            let recoverable_at = state.campaign_end + self.config.grace;
            if now < recoverable_at {
                debug!(campaign_id, %recoverable_at, "No submissions, waiting for grace period");
                return Ok(CampaignOutcome::AwaitingGrace { recoverable_at });
            }
            let receipt = self.ledger.recover_escrow(campaign_id).await?;
            info!(
                campaign_id,
                sponsor = %state.sponsor,
                amount = %state.total_reward,
                tx_hash = %receipt.tx_hash,
                "Escrow returned to sponsor"
            );
            return Ok(CampaignOutcome::Recovered {
                tx_hash: receipt.tx_hash,
            });
        }

        let winners: Vec<String> = ranked.iter().map(|r| r.wallet_address.clone()).collect();
        let submission_times: Vec<i64> = ranked
            .iter()
            .map(|r| r.submission.created_at.timestamp())
            .collect();
        let shares = reward_shares(state.total_reward, winners.len());

        for (rank, (r, share)) in ranked.iter().zip(&shares).enumerate() {
            info!(
                campaign_id,
                rank = rank + 1,
                wallet = %r.wallet_address,
                submission_id = %r.submission.submission_id,
                score = r.submission.performance_score,
                share = %share,
                "Winner"
            );
        }

        let receipt = self
            .ledger
            .settle(campaign_id, &winners, &submission_times)
            .await?;
        info!(campaign_id, tx_hash = %receipt.tx_hash, "Campaign settled");

        Ok(CampaignOutcome::Settled {
            winners,
            shares,
            tx_hash: receipt.tx_hash,
        })
    }

    /// Spawn both cadences. Missed ticks are skipped.
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        info!(
            refresh_every = ?self.config.refresh_every,
            completion_every = ?self.config.completion_every,
            "Starting settlement scheduler"
        );

        let refresh = {
            let scheduler = Arc::clone(&self);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(scheduler.config.refresh_every);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    if let Err(e) = scheduler.run_refresh_tick().await {
                        error!(error = %e, "Analytics refresh failed");
                    }
                }
            })
        };

        let completion = {
            let scheduler = Arc::clone(&self);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(scheduler.config.completion_every);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    if let Err(e) = scheduler.run_completion_tick().await {
                        error!(error = %e, "Completion check failed");
                    }
                }
            })
        };

        vec![refresh, completion]
    }
}
