//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::models::errors::AppError;
use crate::models::types::{FeedStatus, NormalizedTransaction};

/// API Response wrapper
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "API_RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

// ============================================
// Health
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_feeds: usize,
}

// ============================================
// Feeds
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedRequest {
    pub chain: String,
    pub token_address: String,
    pub quote_symbol: String,
    #[serde(default)]
    pub quote_is_stable: Option<bool>,
    #[serde(default)]
    pub pair_address: Option<String>,
    #[serde(default)]
    pub price_usd: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedData {
    pub feed_id: String,
    pub chain: String,
    pub token_address: String,
    pub quote_symbol: String,
    pub quote_is_stable: bool,
}

/// Window entry plus its highlight flag
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: NormalizedTransaction,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedData {
    pub feed_id: String,
    pub chain: String,
    pub token_address: String,
    pub quote_symbol: String,
    pub active: bool,
    pub visible: bool,
    pub price_usd: f64,
    pub created_at: i64,
    pub updates: u64,
    pub status: FeedStatus,
    pub transactions: Vec<TransactionView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriceRequest {
    pub price_usd: f64,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// Acknowledgement for feed mutations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAck {
    pub feed_id: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_envelope_is_camel_case() {
        let json = serde_json::to_value(ApiResponse::success(1u8, 0.5)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["latencyMs"], 0.5);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_from_app_error() {
        let err = AppError::new(ErrorCode::ApiNotFound, "Feed not found");
        let api: ApiError = (&err).into();
        assert_eq!(api.code, "API_NOT_FOUND");
        assert_eq!(api.message, "Feed not found");
    }

    #[test]
    fn test_create_request_optional_fields() {
        let req: CreateFeedRequest = serde_json::from_str(
            r#"{"chain":"base","tokenAddress":"0x01","quoteSymbol":"WETH"}"#,
        )
        .unwrap();
        assert!(req.pair_address.is_none());
        assert!(req.quote_is_stable.is_none());
        assert!(req.price_usd.is_none());
    }
}
