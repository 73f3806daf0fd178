use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::llm::LlmError;
use crate::rate_limit::RateLimitDecision;
use crate::store::StoreError;

// Retry-After used when the upstream throttled us and we have no better hint
pub const FALLBACK_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden - Insufficient permissions")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error("Rate limit exceeded")]
    RateLimited(RateLimitDecision),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::RateLimited(decision) => {
                let retry_after = decision.retry_after.unwrap_or(FALLBACK_RETRY_AFTER_SECS);
                let body = serde_json::json!({
                    "error": "Rate limit exceeded",
                    "retryAfter": retry_after,
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                let headers = response.headers_mut();
                headers.insert("retry-after", HeaderValue::from(retry_after));
                headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
                headers.insert(
                    "x-ratelimit-reset",
                    HeaderValue::from(decision.reset_in.as_millis() as u64),
                );
                response
            }
            AppError::Llm(err) if err.is_throttled() => {
                error!(error = %err, "LLM provider still throttling after retries");
                let body = serde_json::json!({
                    "error": "LLM provider is rate limiting requests, try again later",
                    "retryAfter": FALLBACK_RETRY_AFTER_SECS,
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert("retry-after", HeaderValue::from(FALLBACK_RETRY_AFTER_SECS));
                response
            }
            AppError::Llm(err) => {
                error!(error = %err, "analysis failed");
                let body = serde_json::json!({
                    "error": "Failed to analyze session",
                    "details": err.to_string(),
                });
                (StatusCode::BAD_GATEWAY, Json(body)).into_response()
            }
            other => {
                let status = match &other {
                    AppError::BadRequest(_) | AppError::Store(StoreError::NoAnalysis) => {
                        StatusCode::BAD_REQUEST
                    }
                    AppError::NotFound(_) | AppError::Store(StoreError::SessionNotFound) => {
                        StatusCode::NOT_FOUND
                    }
                    AppError::Unauthorized => StatusCode::UNAUTHORIZED,
                    AppError::Forbidden => StatusCode::FORBIDDEN,
                    AppError::Conflict(_) => StatusCode::CONFLICT,
                    AppError::RateLimited(_) | AppError::Llm(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, Json(serde_json::json!({ "error": other.to_string() }))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn rate_limited_response_carries_quota_headers() {
        let response = AppError::RateLimited(RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_in: Duration::from_millis(41_500),
            retry_after: Some(42),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers["retry-after"], "42");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers["x-ratelimit-reset"], "41500");
    }

    #[test]
    fn exhausted_llm_throttling_maps_to_429() {
        let response = AppError::Llm(LlmError::RateLimited("quota".into())).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "60");
    }

    #[test]
    fn other_llm_failures_map_to_bad_gateway() {
        let response = AppError::Llm(LlmError::EmptyResponse).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        // a parse error quoting an out-of-range score is not throttling
        let response = AppError::Llm(LlmError::InvalidAnalysis(
            "contentCoverage score 429 is outside 1..=3".into(),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(!response.headers().contains_key("retry-after"));
    }

    #[test]
    fn store_errors_map_to_client_errors() {
        assert_eq!(
            AppError::Store(StoreError::NoAnalysis).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Store(StoreError::SessionNotFound).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
