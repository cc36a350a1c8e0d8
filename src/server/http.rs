//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection. Requests are routed
//! on method and decoded path segments.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::Args;
use crate::ledger::Ledger;
use crate::routes::{self, error_response, json_response};
use crate::services::{
    CampaignService, InfluencerService, LlmJudge, MetricsProvider, PerformanceScorer,
    SettlementScheduler, SubmissionRegistry, TranscriptProvider, VerificationPipeline,
    VerificationQueue,
};
use crate::store::{CampaignStore, InfluencerStore, SubmissionStore};
use crate::types::{EngineError, Result};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// External collaborators the engine is assembled from
pub struct Backends {
    pub campaigns: Arc<dyn CampaignStore>,
    pub influencers: Arc<dyn InfluencerStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub metrics: Arc<dyn MetricsProvider>,
    pub transcripts: Arc<dyn TranscriptProvider>,
    pub judge: Arc<dyn LlmJudge>,
    pub ledger: Arc<dyn Ledger>,
    pub clock: Arc<dyn Clock>,
}

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub clock: Arc<dyn Clock>,
    pub campaigns: Arc<CampaignService>,
    pub influencers: Arc<InfluencerService>,
    pub registry: Arc<SubmissionRegistry>,
    pub queue: Arc<VerificationQueue>,
    pub scheduler: Arc<SettlementScheduler>,
    /// Metrics provider, for quota reporting
    pub metrics: Arc<dyn MetricsProvider>,
    /// Influencer store, pinged by the health check
    pub influencer_store: Arc<dyn InfluencerStore>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire services on top of the given backends
    pub fn new(args: Args, backends: Backends) -> Self {
        let Backends {
            campaigns,
            influencers,
            submissions,
            metrics,
            transcripts,
            judge,
            ledger,
            clock,
        } = backends;

        let pipeline = Arc::new(VerificationPipeline::new(
            Arc::clone(&submissions),
            transcripts,
            judge,
            Arc::clone(&clock),
        ));
        let queue = Arc::new(VerificationQueue::new(
            pipeline,
            Arc::clone(&submissions),
            Arc::clone(&campaigns),
            Arc::clone(&clock),
        ));
        let registry = Arc::new(SubmissionRegistry::new(
            Arc::clone(&campaigns),
            Arc::clone(&influencers),
            submissions,
            Arc::clone(&metrics),
            PerformanceScorer::new(args.score_jitter),
            Arc::clone(&queue),
            Arc::clone(&clock),
        ));
        let scheduler = Arc::new(SettlementScheduler::new(
            Arc::clone(&registry),
            ledger,
            Arc::clone(&clock),
            args.scheduler_config(),
        ));

        Self {
            campaigns: Arc::new(CampaignService::new(campaigns, Arc::clone(&clock))),
            influencers: Arc::new(InfluencerService::new(
                Arc::clone(&influencers),
                Arc::clone(&metrics),
                Arc::clone(&clock),
            )),
            registry,
            queue,
            scheduler,
            metrics,
            influencer_store: influencers,
            clock,
            args,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(listen = %state.args.listen, "Campayn listening");
    if state.args.dev_mode {
        warn!("Development mode enabled - in-memory fallbacks and mock providers allowed");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Read the body and dispatch
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(%addr, %method, %path, "Request");

    let body = if method == Method::POST {
        match read_body(req.into_body()).await {
            Ok(body) => body,
            Err(e) => return Ok(error_response(e)),
        }
    } else {
        Bytes::new()
    };

    Ok(route(state, method, &path, &body).await)
}

/// Collect a request body, refusing to buffer more than `MAX_BODY_BYTES`
async fn read_body<B>(body: B) -> Result<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(EngineError::BadRequest(format!(
            "request body exceeds {} bytes",
            MAX_BODY_BYTES
        ))),
        Err(e) => Err(EngineError::BadRequest(format!(
            "Failed to read request body: {}",
            e
        ))),
    }
}

/// Route a request to its handler
pub async fn route(
    state: Arc<AppState>,
    method: Method,
    path: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    match (method, segments.as_slice()) {
        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        (Method::GET, ["api", "health"]) => routes::health_check(state).await,
        (Method::GET, ["api", "quota"]) => routes::quota_status(state),

        // ====================================================================
        // Campaigns
        // ====================================================================
        (Method::POST, ["api", "campaigns"]) => {
            routes::campaigns::create_campaign(state, body).await
        }
        (Method::GET, ["api", "campaigns"]) => routes::campaigns::list_campaigns(state).await,
        (Method::GET, ["api", "campaigns", id]) => {
            routes::campaigns::get_campaign(state, id).await
        }
        (Method::GET, ["api", "campaigns", id, "leaderboard"]) => {
            routes::campaigns::leaderboard(state, id).await
        }
        (Method::GET, ["api", "campaigns", id, "submissions"]) => {
            routes::campaigns::list_submissions(state, id).await
        }

        // ====================================================================
        // Influencers
        // ====================================================================
        (Method::POST, ["api", "influencers"]) => {
            routes::influencers::upsert_profile(state, body).await
        }
        (Method::POST, ["api", "influencers", "verify-channel"]) => {
            routes::influencers::verify_channel(state, body).await
        }
        (Method::POST, ["api", "influencers", "verify-video-ownership"]) => {
            routes::influencers::verify_video_ownership(state, body).await
        }
        (Method::GET, ["api", "influencers", wallet]) => {
            routes::influencers::get_profile(state, wallet).await
        }
        (Method::GET, ["api", "influencers", wallet, "verification-status"]) => {
            routes::influencers::verification_status(state, wallet).await
        }

        // ====================================================================
        // Submissions
        // ====================================================================
        (Method::POST, ["api", "submissions"]) => routes::submissions::submit(state, body).await,
        (Method::GET, ["api", "submissions", id, "verification"]) => {
            routes::submissions::verification(state, id).await
        }
        (Method::POST, ["api", "submissions", id, "verify"]) => {
            routes::submissions::retrigger(state, id).await
        }

        _ => not_found_response(path),
    }
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        serde_json::json!({
            "error": "Not Found",
            "code": "NOT_FOUND",
            "path": path,
        }),
    )
}
