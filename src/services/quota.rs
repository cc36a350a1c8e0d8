//! Quota-limited metrics API client
//!
//! Every call is charged against a daily unit budget. The cost is reserved
//! before the first attempt and released when the call ultimately fails,
//! so concurrent callers can never jointly overshoot the limit.
//!
//! Retry policy:
//! - 429: wait for `Retry-After` (or `2^attempt` seconds) and retry
//! - 403: fail immediately
//! - anything else: wait `2^attempt` seconds and retry
//!
//! No sleep happens after the final attempt.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::types::{EngineError, Result};

/// Default YouTube Data API daily budget
pub const DEFAULT_DAILY_LIMIT: u64 = 10_000;
/// Default number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// Transport
// ============================================================================

/// Raw response from the provider
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// `Retry-After` header in seconds, when present
    pub retry_after: Option<u64>,
    pub body: String,
}

/// Minimal GET transport so the retry logic can be driven without a network
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<ApiResponse>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("campayn/0.1")
            .build()
            .unwrap_or_default();
        Self { http_client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        let response = self.http_client.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await?;
        Ok(ApiResponse {
            status,
            retry_after,
            body,
        })
    }
}

// ============================================================================
// Quota accounting
// ============================================================================

#[derive(Debug)]
struct QuotaState {
    used: u64,
    requests_today: u64,
    day: NaiveDate,
}

impl QuotaState {
    /// Reset counters when the UTC date has advanced
    fn roll_over(&mut self, today: NaiveDate) {
        if today > self.day {
            info!(
                previous_day = %self.day,
                used = self.used,
                requests = self.requests_today,
                "Metrics API quota reset for new day"
            );
            self.used = 0;
            self.requests_today = 0;
            self.day = today;
        }
    }
}

/// Snapshot of quota usage
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub percentage: u64,
    pub requests_today: u64,
    pub day: NaiveDate,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub base_url: String,
    pub api_key: String,
    pub daily_limit: u64,
    pub max_attempts: u32,
}

impl QuotaConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            daily_limit: DEFAULT_DAILY_LIMIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Metrics API client with a daily unit budget and retry/backoff
pub struct QuotaLimitedClient {
    config: QuotaConfig,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    state: Mutex<QuotaState>,
}

impl QuotaLimitedClient {
    pub fn new(config: QuotaConfig, transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        let day = clock.now().date_naive();
        Self {
            config,
            transport,
            clock,
            state: Mutex::new(QuotaState {
                used: 0,
                requests_today: 0,
                day,
            }),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reserve `cost` units for today, or fail without touching the counter
    fn reserve(&self, cost: u64) -> Result<NaiveDate> {
        let today = self.clock.now().date_naive();
        let mut state = self.lock_state();
        state.roll_over(today);

        if state.used + cost > self.config.daily_limit {
            return Err(EngineError::QuotaExceeded {
                used: state.used,
                limit: self.config.daily_limit,
                cost,
            });
        }
        state.used += cost;
        Ok(state.day)
    }

    /// Give back a reservation made on `day`. A reservation from a day
    /// that has already rolled over is dropped.
    fn release(&self, cost: u64, day: NaiveDate) {
        let mut state = self.lock_state();
        if state.day == day {
            state.used = state.used.saturating_sub(cost);
        }
    }

    fn record_success(&self, day: NaiveDate) {
        let mut state = self.lock_state();
        if state.day == day {
            state.requests_today += 1;
        }
    }

    /// Perform a quota-charged GET against `endpoint`
    pub async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        cost: u64,
    ) -> Result<serde_json::Value> {
        let day = self.reserve(cost)?;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        query.push(("key".to_string(), self.config.api_key.clone()));

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            debug!(endpoint, attempt, max_attempts, cost, "Metrics API request");

            let delay = match self.transport.get(&url, &query).await {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    self.record_success(day);
                    return serde_json::from_str(&resp.body).map_err(|e| {
                        EngineError::TransientExternal(format!(
                            "{} returned invalid JSON: {}",
                            endpoint, e
                        ))
                    });
                }
                Ok(resp) if resp.status == 429 => {
                    last_error = format!("{} rate limited", endpoint);
                    let secs = resp.retry_after.unwrap_or(1u64 << attempt);
                    warn!(endpoint, attempt, wait_secs = secs, "Metrics API rate limited");
                    Duration::from_secs(secs)
                }
                Ok(resp) if resp.status == 403 => {
                    self.release(cost, day);
                    warn!(endpoint, "Metrics API access forbidden");
                    return Err(EngineError::AccessForbidden(format!(
                        "{} refused access (quota exhausted or key invalid)",
                        endpoint
                    )));
                }
                Ok(resp) => {
                    last_error = format!("{} returned HTTP {}", endpoint, resp.status);
                    warn!(endpoint, attempt, status = resp.status, "Metrics API error");
                    Duration::from_secs(1u64 << attempt)
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(endpoint, attempt, error = %e, "Metrics API transport error");
                    Duration::from_secs(1u64 << attempt)
                }
            };

            if attempt < max_attempts {
                self.clock.sleep(delay).await;
            }
        }

        self.release(cost, day);
        Err(EngineError::TransientExternal(format!(
            "{} failed after {} attempts: {}",
            endpoint, max_attempts, last_error
        )))
    }

    /// Current usage, after applying any pending day rollover
    pub fn status(&self) -> QuotaStatus {
        let today = self.clock.now().date_naive();
        let mut state = self.lock_state();
        state.roll_over(today);

        let limit = self.config.daily_limit;
        let percentage = if limit == 0 {
            100
        } else {
            ((state.used as f64 / limit as f64) * 100.0).round() as u64
        };

        QuotaStatus {
            used: state.used,
            limit,
            remaining: limit.saturating_sub(state.used),
            percentage,
            requests_today: state.requests_today,
            day: state.day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport replaying a scripted sequence of outcomes
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<ApiResponse>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<ApiResponse>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, _url: &str, query: &[(String, String)]) -> Result<ApiResponse> {
            assert!(query.iter().any(|(k, _)| k == "key"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ok()))
        }
    }

    fn ok() -> ApiResponse {
        ApiResponse {
            status: 200,
            retry_after: None,
            body: r#"{"items":[]}"#.into(),
        }
    }

    fn status(code: u16, retry_after: Option<u64>) -> ApiResponse {
        ApiResponse {
            status: code,
            retry_after,
            body: String::new(),
        }
    }

    fn client(
        limit: u64,
        transport: Arc<ScriptedTransport>,
    ) -> (QuotaLimitedClient, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        ));
        let mut config = QuotaConfig::new("https://api.test/v3", "k");
        config.daily_limit = limit;
        (
            QuotaLimitedClient::new(config, transport, clock.clone()),
            clock,
        )
    }

    #[tokio::test]
    async fn test_success_charges_cost() {
        let transport = ScriptedTransport::new(vec![Ok(ok())]);
        let (client, _) = client(100, transport.clone());

        let body = client.request("videos", &[("id", "x".into())], 5).await.unwrap();
        assert!(body.get("items").is_some());

        let status = client.status();
        assert_eq!(status.used, 5);
        assert_eq!(status.remaining, 95);
        assert_eq!(status.percentage, 5);
        assert_eq!(status.requests_today, 1);
    }

    #[tokio::test]
    async fn test_over_limit_not_attempted() {
        let transport = ScriptedTransport::new(vec![]);
        let (client, _) = client(100, transport.clone());

        client.request("search", &[], 100).await.unwrap();
        let err = client.request("videos", &[], 1).await.unwrap_err();

        assert!(matches!(err, EngineError::QuotaExceeded { used: 100, limit: 100, cost: 1 }));
        assert_eq!(transport.calls(), 1);
        assert_eq!(client.status().used, 100);
    }

    #[tokio::test]
    async fn test_rate_limit_honors_retry_after() {
        let transport = ScriptedTransport::new(vec![Ok(status(429, Some(3))), Ok(ok())]);
        let (client, clock) = client(100, transport.clone());

        client.request("videos", &[], 1).await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
        assert_eq!(client.status().used, 1);
    }

    #[tokio::test]
    async fn test_rate_limit_without_header_backs_off() {
        let transport = ScriptedTransport::new(vec![Ok(status(429, None)), Ok(ok())]);
        let (client, clock) = client(100, transport.clone());

        client.request("videos", &[], 1).await.unwrap();
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_forbidden_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(status(403, None))]);
        let (client, clock) = client(100, transport.clone());

        let err = client.request("videos", &[], 1).await.unwrap_err();

        assert!(matches!(err, EngineError::AccessForbidden(_)));
        assert_eq!(transport.calls(), 1);
        assert!(clock.sleeps().is_empty());
        assert_eq!(client.status().used, 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_release_reservation() {
        let transport = ScriptedTransport::new(vec![
            Ok(status(500, None)),
            Err(EngineError::TransientExternal("connection reset".into())),
            Ok(status(503, None)),
        ]);
        let (client, clock) = client(100, transport.clone());

        let err = client.request("videos", &[], 1).await.unwrap_err();

        assert!(matches!(err, EngineError::TransientExternal(_)));
        assert_eq!(transport.calls(), 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        let status = client.status();
        assert_eq!(status.used, 0);
        assert_eq!(status.requests_today, 0);
    }

    #[tokio::test]
    async fn test_resets_once_per_utc_day() {
        let transport = ScriptedTransport::new(vec![]);
        let (client, clock) = client(10, transport.clone());

        client.request("videos", &[], 10).await.unwrap();
        clock.advance(chrono::Duration::hours(13));
        // 23:00 the same day
        assert_eq!(client.status().used, 10);
        assert!(client.request("videos", &[], 1).await.is_err());

        clock.advance(chrono::Duration::hours(2));
        let status = client.status();
        assert_eq!(status.used, 0);
        assert_eq!(status.requests_today, 0);
        assert_eq!(status.day, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());

        client.request("videos", &[], 4).await.unwrap();
        assert_eq!(client.status().used, 4);
    }

    #[tokio::test]
    async fn test_concurrent_callers_cannot_overshoot() {
        let transport = ScriptedTransport::new(vec![]);
        let (client, _) = client(150, transport.clone());

        let (a, b) = tokio::join!(
            client.request("search", &[], 100),
            client.request("search", &[], 100)
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(transport.calls(), 1);
        assert!(client.status().used <= 150);
    }
}
