//! Configuration for Campayn
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

use crate::ledger::grace_period;
use crate::services::SchedulerConfig;
use crate::types::{EngineError, Result};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Campayn - campaign settlement and content verification engine
#[derive(Parser, Debug, Clone)]
#[command(name = "campayn")]
#[command(about = "Settles sponsored video campaigns and verifies submitted content")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory fallbacks, mock providers for missing keys)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "campayn")]
    pub mongodb_db: String,

    /// YouTube Data API key
    #[arg(long, env = "YOUTUBE_API_KEY")]
    pub youtube_api_key: Option<String>,

    /// YouTube Data API base URL
    #[arg(
        long,
        env = "YOUTUBE_API_URL",
        default_value = "https://www.googleapis.com/youtube/v3"
    )]
    pub youtube_api_url: String,

    /// Daily YouTube quota in units
    #[arg(long, env = "YOUTUBE_DAILY_QUOTA", default_value = "10000")]
    pub youtube_daily_quota: u64,

    /// Supadata API key for transcripts
    #[arg(long, env = "SUPADATA_API_KEY")]
    pub supadata_api_key: Option<String>,

    /// Supadata API base URL
    #[arg(long, env = "SUPADATA_API_URL", default_value = "https://api.supadata.ai/v1")]
    pub supadata_api_url: String,

    /// Gemini API key for content judging
    #[arg(long, env = "GEMINI_API_KEY")]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash-lite")]
    pub gemini_model: String,

    /// Gemini API base URL
    #[arg(
        long,
        env = "GEMINI_API_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub gemini_api_url: String,

    /// Ledger relayer base URL (in-memory ledger when unset in dev mode)
    #[arg(long, env = "LEDGER_URL")]
    pub ledger_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Request timeout for outbound calls in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Seconds between analytics refresh runs
    #[arg(long, env = "ANALYTICS_INTERVAL_SECS", default_value = "7200")]
    pub analytics_interval_secs: u64,

    /// Seconds between campaign completion checks
    #[arg(long, env = "COMPLETION_INTERVAL_SECS", default_value = "3600")]
    pub completion_interval_secs: u64,

    /// Analytics older than this many seconds are refreshed
    #[arg(long, env = "ANALYTICS_STALE_SECS", default_value = "3600")]
    pub analytics_stale_secs: u64,

    /// Days after campaign end before an empty campaign's escrow is recovered
    #[arg(long, env = "GRACE_PERIOD_DAYS", default_value = "7")]
    pub grace_period_days: i64,

    /// Seconds between sweeps for stuck verifications
    #[arg(long, env = "VERIFICATION_SWEEP_SECS", default_value = "600")]
    pub verification_sweep_secs: u64,

    /// Pending verifications older than this many seconds are re-enqueued
    #[arg(long, env = "VERIFICATION_STALE_SECS", default_value = "1800")]
    pub verification_stale_secs: u64,

    /// Add a small random component to performance scores
    #[arg(long, env = "SCORE_JITTER", default_value = "false")]
    pub score_jitter: bool,
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            refresh_every: Duration::from_secs(self.analytics_interval_secs),
            completion_every: Duration::from_secs(self.completion_interval_secs),
            stale_after: chrono::Duration::seconds(self.analytics_stale_secs as i64),
            grace: grace_period(self.grace_period_days),
        }
    }

    pub fn verification_sweep_every(&self) -> Duration {
        Duration::from_secs(self.verification_sweep_secs)
    }

    pub fn verification_stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.verification_stale_secs as i64)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.dev_mode {
            if self.youtube_api_key.is_none() {
                return Err(EngineError::Config(
                    "YOUTUBE_API_KEY is required in production mode".into(),
                ));
            }
            if self.supadata_api_key.is_none() {
                return Err(EngineError::Config(
                    "SUPADATA_API_KEY is required in production mode".into(),
                ));
            }
            if self.gemini_api_key.is_none() {
                return Err(EngineError::Config(
                    "GEMINI_API_KEY is required in production mode".into(),
                ));
            }
            if self.ledger_url.is_none() {
                return Err(EngineError::Config(
                    "LEDGER_URL is required in production mode".into(),
                ));
            }
        }

        if self.youtube_daily_quota == 0 {
            return Err(EngineError::Config(
                "YOUTUBE_DAILY_QUOTA must be greater than zero".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(EngineError::Config(
                "REQUEST_TIMEOUT_MS must be greater than zero".into(),
            ));
        }
        for (name, value) in [
            ("ANALYTICS_INTERVAL_SECS", self.analytics_interval_secs),
            ("COMPLETION_INTERVAL_SECS", self.completion_interval_secs),
            ("ANALYTICS_STALE_SECS", self.analytics_stale_secs),
            ("VERIFICATION_SWEEP_SECS", self.verification_sweep_secs),
            ("VERIFICATION_STALE_SECS", self.verification_stale_secs),
        ] {
            if value == 0 {
                return Err(EngineError::Config(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        if self.grace_period_days < 0 {
            return Err(EngineError::Config(
                "GRACE_PERIOD_DAYS must not be negative".into(),
            ));
        }

        Ok(())
    }
}
