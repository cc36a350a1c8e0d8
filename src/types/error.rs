//! Error types for the settlement engine
//!
//! One taxonomy shared by the services, the stores and the HTTP layer.

use hyper::StatusCode;

/// Main error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Daily metrics quota would be exceeded; the call was not attempted.
    #[error("Quota exceeded: used {used}/{limit}, request cost {cost}")]
    QuotaExceeded { used: u64, limit: u64, cost: u64 },

    /// Provider refused access (HTTP 403). Not retried.
    #[error("Access forbidden: {0}")]
    AccessForbidden(String),

    /// External call failed after the retry budget was spent.
    #[error("External service error: {0}")]
    TransientExternal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Video belongs to channel {actual}, expected {expected}")]
    OwnershipMismatch { expected: String, actual: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already submitted: submission {submission_id} exists for this campaign")]
    AlreadySubmitted { submission_id: String },

    #[error("Verification processing error ({code}): {message}")]
    VerificationProcessing { code: String, message: String },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::AccessForbidden(_) => StatusCode::FORBIDDEN,
            Self::TransientExternal(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::OwnershipMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AlreadySubmitted { .. } => StatusCode::CONFLICT,
            Self::VerificationProcessing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ledger(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::AccessForbidden(_) => "ACCESS_FORBIDDEN",
            Self::TransientExternal(_) => "EXTERNAL_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::OwnershipMismatch { .. } => "OWNERSHIP_MISMATCH",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::AlreadySubmitted { .. } => "ALREADY_SUBMITTED",
            Self::VerificationProcessing { .. } => "VERIFICATION_ERROR",
            Self::Ledger(_) => "LEDGER_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for EngineError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for EngineError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransientExternal(err.to_string())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
