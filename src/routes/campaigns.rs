//! Campaign endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;

use super::{error_response, parse_body, parse_campaign_id, respond};
use crate::models::NewCampaign;
use crate::server::AppState;

/// POST /api/campaigns
pub async fn create_campaign(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let request: NewCampaign = match parse_body(body) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };
    respond(StatusCode::CREATED, state.campaigns.create(request).await)
}

/// GET /api/campaigns
pub async fn list_campaigns(state: Arc<AppState>) -> Response<Full<Bytes>> {
    respond(StatusCode::OK, state.campaigns.list().await)
}

/// GET /api/campaigns/{id}
pub async fn get_campaign(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    match parse_campaign_id(id) {
        Ok(id) => respond(StatusCode::OK, state.campaigns.get(id).await),
        Err(e) => error_response(e),
    }
}

/// GET /api/campaigns/{id}/leaderboard
pub async fn leaderboard(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    match parse_campaign_id(id) {
        Ok(id) => respond(StatusCode::OK, state.registry.leaderboard(id).await),
        Err(e) => error_response(e),
    }
}

/// GET /api/campaigns/{id}/submissions
pub async fn list_submissions(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    match parse_campaign_id(id) {
        Ok(id) => respond(StatusCode::OK, state.registry.list_for_campaign(id).await),
        Err(e) => error_response(e),
    }
}
