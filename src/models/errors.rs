//! Centralized Error Handling Module
//!
//! Every failure in the feed carries a unique code so logs and API responses
//! can be grepped and alerted on.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - POOL_xxx / TIER_xxx / CASCADE_xxx: upstream data path
//! - RECORD_xxx: per-record normalization
//! - API_xxx: feed session API
//! - CFG_xxx: configuration

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Whether the caller should offer a retry
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Upstream data path
    // ============================================
    /// No pool address could be resolved (non-fatal, pool tier is skipped)
    PoolNotFound,
    /// Tier request could not be sent or completed
    TierRequestFailed,
    /// Tier answered with a non-success HTTP status
    TierHttpStatus,
    /// Tier answered `success: false`
    TierRejected,
    /// Tier answered with no transactions
    TierEmpty,
    /// Tier response could not be parsed
    TierInvalidResponse,
    /// Every tier failed for this cascade run
    CascadeExhausted,
    /// Upstream timed out
    ExternalTimeout,

    // ============================================
    // Normalization
    // ============================================
    /// Record could not be classified as buy/sell
    RecordSkipped,

    // ============================================
    // API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Feed session not found
    ApiNotFound,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PoolNotFound => "POOL_NOT_FOUND",
            Self::TierRequestFailed => "TIER_REQUEST_FAILED",
            Self::TierHttpStatus => "TIER_HTTP_STATUS",
            Self::TierRejected => "TIER_REJECTED",
            Self::TierEmpty => "TIER_EMPTY",
            Self::TierInvalidResponse => "TIER_INVALID_RESPONSE",
            Self::CascadeExhausted => "CASCADE_EXHAUSTED",
            Self::ExternalTimeout => "EXTERNAL_TIMEOUT",

            Self::RecordSkipped => "RECORD_SKIPPED",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiNotFound => "API_NOT_FOUND",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::ConfigInvalidValue => 400,
            Self::ApiNotFound | Self::PoolNotFound => 404,
            Self::ApiRateLimited => 429,
            Self::CascadeExhausted
            | Self::TierRequestFailed
            | Self::TierHttpStatus
            | Self::TierRejected
            | Self::TierEmpty
            | Self::TierInvalidResponse => 502,
            Self::ExternalTimeout => 504,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TierRequestFailed
                | Self::TierHttpStatus
                | Self::TierRejected
                | Self::TierEmpty
                | Self::TierInvalidResponse
                | Self::CascadeExhausted
                | Self::ExternalTimeout
                | Self::ApiRateLimited
        )
    }

    /// Whether this code belongs to a single-tier failure
    pub fn is_tier_failure(&self) -> bool {
        matches!(
            self,
            Self::TierRequestFailed
                | Self::TierHttpStatus
                | Self::TierRejected
                | Self::TierEmpty
                | Self::TierInvalidResponse
                | Self::ExternalTimeout
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Tier answered with a non-success HTTP status
    pub fn tier_status(tier: &str, status: u16) -> Self {
        Self::new(
            ErrorCode::TierHttpStatus,
            format!("{} tier returned HTTP {}", tier, status),
        )
    }

    /// Tier answered `success: false`
    pub fn tier_rejected(tier: &str) -> Self {
        Self::new(ErrorCode::TierRejected, format!("{} tier reported success=false", tier))
    }

    /// Tier answered with an empty list
    pub fn tier_empty(tier: &str) -> Self {
        Self::new(ErrorCode::TierEmpty, format!("{} tier returned no transactions", tier))
    }

    /// Every tier failed
    pub fn cascade_exhausted(tried: usize) -> Self {
        Self::new(
            ErrorCode::CascadeExhausted,
            format!("All {} source tiers failed", tried),
        )
    }

    /// No pool address resolved
    pub fn pool_not_found(token: &str) -> Self {
        Self::new(ErrorCode::PoolNotFound, format!("No pool resolved for {}", token))
    }

    /// Record could not be classified
    pub fn record_skipped(hash: &str) -> Self {
        Self::new(
            ErrorCode::RecordSkipped,
            format!("Record {} is neither buy nor sell", hash),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API not found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiNotFound, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ExternalTimeout, "Request timeout")
        } else if err.is_decode() {
            Self::with_source(ErrorCode::TierInvalidResponse, "Response decode failed", err)
        } else {
            Self::with_source(ErrorCode::TierRequestFailed, "Request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::TierInvalidResponse, "JSON parse error", err)
    }
}
