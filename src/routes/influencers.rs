//! Influencer profile and channel verification endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{error_response, parse_body, respond};
use crate::models::ProfileUpdate;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyChannelRequest {
    pub wallet_address: String,
    pub channel_id: String,
    pub verification_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOwnershipRequest {
    pub video_id: String,
    pub expected_channel_id: String,
}

/// POST /api/influencers
pub async fn upsert_profile(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let update: ProfileUpdate = match parse_body(body) {
        Ok(u) => u,
        Err(e) => return error_response(e),
    };
    respond(StatusCode::OK, state.influencers.upsert_profile(update).await)
}

/// GET /api/influencers/{wallet}
pub async fn get_profile(state: Arc<AppState>, wallet: &str) -> Response<Full<Bytes>> {
    respond(StatusCode::OK, state.influencers.get(wallet).await)
}

/// POST /api/influencers/verify-channel
pub async fn verify_channel(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let request: VerifyChannelRequest = match parse_body(body) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };
    respond(
        StatusCode::OK,
        state
            .influencers
            .verify_channel(
                &request.wallet_address,
                &request.channel_id,
                &request.verification_code,
            )
            .await,
    )
}

/// GET /api/influencers/{wallet}/verification-status
pub async fn verification_status(state: Arc<AppState>, wallet: &str) -> Response<Full<Bytes>> {
    respond(
        StatusCode::OK,
        state.influencers.verification_status(wallet).await,
    )
}

/// POST /api/influencers/verify-video-ownership
pub async fn verify_video_ownership(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let request: VerifyOwnershipRequest = match parse_body(body) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };
    respond(
        StatusCode::OK,
        state
            .influencers
            .verify_video_ownership(&request.video_id, &request.expected_channel_id)
            .await,
    )
}
