//! Submission endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;

use super::{error_response, parse_body, respond};
use crate::server::AppState;
use crate::services::SubmitRequest;

/// POST /api/submissions
///
/// Responds 201 with the submission in `pending` state; verification runs
/// in the background.
pub async fn submit(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let request: SubmitRequest = match parse_body(body) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };
    respond(StatusCode::CREATED, state.registry.submit(request).await)
}

/// GET /api/submissions/{id}/verification
pub async fn verification(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    respond(StatusCode::OK, state.registry.verification_status(id).await)
}

/// POST /api/submissions/{id}/verify
pub async fn retrigger(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    respond(
        StatusCode::ACCEPTED,
        state.registry.retrigger_verification(id).await,
    )
}
