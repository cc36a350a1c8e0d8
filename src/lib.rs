//! Campayn - campaign settlement and content verification engine
//!
//! Sponsors fund campaigns in an escrow ledger; influencers enter one video
//! each. The engine validates and scores entries against a quota-limited
//! metrics API, verifies content through a transcript provider and an LLM
//! judge, and settles ended campaigns by paying the top three.
//!
//! ## Services
//!
//! - **Quota**: daily unit budget with retry and backoff for the metrics API
//! - **Scoring**: performance score from views, engagement and duration
//! - **Verification**: detached transcript + judge pipeline with a recovery sweep
//! - **Submissions**: validated entry, resubmission and ranking
//! - **Scheduler**: analytics refresh and campaign settlement or escrow recovery

pub mod clock;
pub mod config;
pub mod db;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState, Backends};
pub use types::{EngineError, Result};
