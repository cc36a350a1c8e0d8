//! Engine services
//!
//! Quota-limited metrics access, scoring, content verification, the
//! submission registry and the settlement scheduler.

pub mod campaigns;
pub mod influencers;
pub mod judge;
pub mod metrics;
pub mod mock;
pub mod quota;
pub mod scheduler;
pub mod scoring;
pub mod submissions;
pub mod transcript;
pub mod verification;

pub use campaigns::CampaignService;
pub use influencers::{ChannelVerification, EligibilityReport, InfluencerService, OwnershipReport};
pub use judge::{GeminiJudge, JudgeVerdict, LlmJudge, DEFAULT_GEMINI_MODEL};
pub use metrics::{extract_video_id, MetricsProvider, VideoDetails, YouTubeMetrics};
pub use mock::{MockJudge, MockMetrics, MockTranscripts};
pub use quota::{HttpTransport, QuotaConfig, QuotaLimitedClient, QuotaStatus, ReqwestTransport};
pub use scheduler::{CampaignOutcome, SchedulerConfig, SettlementScheduler, TickReport};
pub use scoring::PerformanceScorer;
pub use submissions::{LeaderboardEntry, RankedSubmission, SubmissionRegistry, SubmitRequest};
pub use transcript::{SupadataClient, Transcript, TranscriptProvider};
pub use verification::{VerificationPipeline, VerificationQueue};
