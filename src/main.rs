//! Campayn - campaign settlement and content verification engine

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use campayn::{
    clock::{Clock, SystemClock},
    config::Args,
    db::MongoClient,
    ledger::{HttpLedger, InMemoryLedger, Ledger},
    logging,
    server::{self, AppState, Backends},
    services::{
        GeminiJudge, LlmJudge, MetricsProvider, MockJudge, MockMetrics, MockTranscripts,
        QuotaConfig, QuotaLimitedClient, ReqwestTransport, SupadataClient, TranscriptProvider,
        YouTubeMetrics,
    },
    store::{
        CampaignStore, InMemoryCampaignStore, InMemoryInfluencerStore, InMemorySubmissionStore,
        InfluencerStore, MongoCampaignStore, MongoInfluencerStore, MongoSubmissionStore,
        SubmissionStore,
    },
};

type Stores = (
    Arc<dyn CampaignStore>,
    Arc<dyn InfluencerStore>,
    Arc<dyn SubmissionStore>,
);

async fn mongo_stores(client: &MongoClient) -> campayn::Result<Stores> {
    let campaigns: Arc<dyn CampaignStore> = Arc::new(MongoCampaignStore::new(client).await?);
    let influencers: Arc<dyn InfluencerStore> = Arc::new(MongoInfluencerStore::new(client).await?);
    let submissions: Arc<dyn SubmissionStore> =
        Arc::new(MongoSubmissionStore::new(client).await?);
    Ok((campaigns, influencers, submissions))
}

fn memory_stores() -> Stores {
    let campaigns: Arc<dyn CampaignStore> = Arc::new(InMemoryCampaignStore::new());
    let influencers: Arc<dyn InfluencerStore> = Arc::new(InMemoryInfluencerStore::new());
    let submissions: Arc<dyn SubmissionStore> = Arc::new(InMemorySubmissionStore::new());
    (campaigns, influencers, submissions)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init(&args.log_level, args.log_format);

    if let Err(e) = args.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    // Startup banner (no secrets)
    info!("======================================");
    info!("  Campayn - Campaign Settlement Engine");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
    info!("YouTube API: {} (daily quota {})", args.youtube_api_url, args.youtube_daily_quota);
    info!("Supadata API: {}", args.supadata_api_url);
    info!("Gemini: {} ({})", args.gemini_api_url, args.gemini_model);
    info!("Ledger: {}", args.ledger_url.as_deref().unwrap_or("in-memory"));
    info!(
        "Analytics refresh every {}s (stale after {}s), completion every {}s, grace {} days",
        args.analytics_interval_secs,
        args.analytics_stale_secs,
        args.completion_interval_secs,
        args.grace_period_days
    );
    info!(
        "Verification sweep every {}s (stale after {}s)",
        args.verification_sweep_secs, args.verification_stale_secs
    );
    info!("======================================");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let timeout = args.request_timeout();

    // Connect to MongoDB (optional in dev mode)
    let connected = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => mongo_stores(&client).await,
        Err(e) => Err(e),
    };
    let (campaigns, influencers, submissions) = match connected {
        Ok(stores) => {
            info!("MongoDB connected successfully");
            stores
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB unavailable (dev mode, using in-memory stores): {}", e);
                memory_stores()
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let metrics: Arc<dyn MetricsProvider> = match &args.youtube_api_key {
        Some(key) => {
            let mut config = QuotaConfig::new(&args.youtube_api_url, key);
            config.daily_limit = args.youtube_daily_quota;
            let client = Arc::new(QuotaLimitedClient::new(
                config,
                Arc::new(ReqwestTransport::new(timeout)),
                Arc::clone(&clock),
            ));
            Arc::new(YouTubeMetrics::new(client))
        }
        None => {
            warn!("YOUTUBE_API_KEY not set (dev mode, using mock metrics)");
            Arc::new(MockMetrics::new())
        }
    };

    let transcripts: Arc<dyn TranscriptProvider> = match &args.supadata_api_key {
        Some(key) => Arc::new(SupadataClient::new(&args.supadata_api_url, key, timeout)),
        None => {
            warn!("SUPADATA_API_KEY not set (dev mode, using mock transcripts)");
            Arc::new(MockTranscripts::new())
        }
    };

    let judge: Arc<dyn LlmJudge> = match &args.gemini_api_key {
        Some(key) => Arc::new(GeminiJudge::new(
            &args.gemini_api_url,
            key,
            &args.gemini_model,
            timeout,
        )),
        None => {
            warn!("GEMINI_API_KEY not set (dev mode, mock judge approves everything)");
            Arc::new(MockJudge::new())
        }
    };

    let ledger: Arc<dyn Ledger> = match &args.ledger_url {
        Some(url) => Arc::new(HttpLedger::new(url.as_str(), timeout)),
        None => {
            warn!("LEDGER_URL not set (dev mode, using in-memory ledger)");
            Arc::new(InMemoryLedger::new(Arc::clone(&clock)).with_grace_days(args.grace_period_days))
        }
    };

    let state = Arc::new(AppState::new(
        args.clone(),
        Backends {
            campaigns,
            influencers,
            submissions,
            metrics,
            transcripts,
            judge,
            ledger,
            clock,
        },
    ));

    // Background work
    let _scheduler = Arc::clone(&state.scheduler).start();
    let _sweeper = Arc::clone(&state.queue)
        .start_sweeper(args.verification_sweep_every(), args.verification_stale_after());

    if let Err(e) = server::run(state).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
