//! HTTP routes for Campayn
//!
//! Handlers take the already-read request body and return a complete
//! JSON response. Errors are rendered as `{error, code}` with the status
//! of the [`EngineError`].

pub mod campaigns;
pub mod health;
pub mod influencers;
pub mod submissions;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::types::{EngineError, Result};

pub use health::{health_check, quota_status};

/// Serialize `body` as a JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response<Full<Bytes>> {
    let (status, json) = match serde_json::to_vec(&body) {
        Ok(json) => (status, json),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"response serialization failed","code":"INTERNAL_ERROR"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

pub fn error_response(err: EngineError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    if status.is_server_error() {
        error!(code = err.code(), error = %err, "Request failed");
    } else {
        warn!(code = err.code(), error = %err, "Request rejected");
    }
    let code = err.code();
    let (status, message) = err.into_status_code_and_body();
    json_response(status, serde_json::json!({ "error": message, "code": code }))
}

/// Render a service result, using `status` on success
pub fn respond<T: Serialize>(status: StatusCode, result: Result<T>) -> Response<Full<Bytes>> {
    match result {
        Ok(body) => json_response(status, body),
        Err(e) => error_response(e),
    }
}

/// Parse a JSON request body
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return Err(EngineError::BadRequest("request body is required".into()));
    }
    serde_json::from_slice(body).map_err(|e| EngineError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Parse a numeric campaign id path segment
pub fn parse_campaign_id(segment: &str) -> Result<u64> {
    segment
        .parse()
        .map_err(|_| EngineError::BadRequest(format!("invalid campaign id: {}", segment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_carries_code() {
        let response = error_response(EngineError::AlreadySubmitted {
            submission_id: "s1".into(),
        });
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let body = body_json(response).await;
        assert_eq!(body["code"], "ALREADY_SUBMITTED");
        assert!(body["error"].as_str().unwrap().contains("s1"));
    }

    #[test]
    fn test_parse_body() {
        #[derive(serde::Deserialize)]
        struct Probe {
            #[allow(dead_code)]
            name: String,
        }
        assert!(parse_body::<Probe>(br#"{"name":"x"}"#).is_ok());
        assert!(matches!(parse_body::<Probe>(b""), Err(EngineError::BadRequest(_))));
        assert!(matches!(parse_body::<Probe>(b"{"), Err(EngineError::BadRequest(_))));
    }

    #[test]
    fn test_parse_campaign_id() {
        assert_eq!(parse_campaign_id("42").unwrap(), 42);
        assert!(parse_campaign_id("abc").is_err());
    }
}
