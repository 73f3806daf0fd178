mod analyze;
mod fellows;
mod health;
mod metrics;
mod seed;
mod sessions;
mod supervisors;
mod validate;

pub use analyze::analyze_handler;
pub use fellows::{create_fellow_handler, list_fellows_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use seed::seed_handler;
pub use sessions::{create_session_handler, get_session_handler, list_sessions_handler};
pub use supervisors::{create_supervisor_handler, list_supervisors_handler};
pub use validate::validate_handler;

use axum::{
    Router,
    http::{HeaderMap, HeaderValue},
    routing::{get, post},
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::client_ip::{UNKNOWN_CLIENT, client_identifier};
use crate::error::AppError;
use crate::metrics::{ADMISSION_CHECKS_TOTAL, RATE_LIMITED_TOTAL};
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/fellows", get(list_fellows_handler).post(create_fellow_handler))
        .route(
            "/api/supervisors",
            get(list_supervisors_handler).post(create_supervisor_handler),
        )
        .route("/api/sessions", get(list_sessions_handler).post(create_session_handler))
        .route("/api/sessions/{id}", get(get_session_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/validate", post(validate_handler))
        .route("/api/seed", post(seed_handler))
        .with_state(state)
}

// Rate limit check for the calling client - Err carries the rejection
fn admit(state: &AppState, headers: &HeaderMap) -> Result<RateLimitDecision, AppError> {
    ADMISSION_CHECKS_TOTAL.inc();
    let identifier = client_identifier(headers);
    let decision = state.rate_limiter.check(&identifier);

    if !decision.allowed {
        RATE_LIMITED_TOTAL.inc();
        let shared_bucket = identifier == UNKNOWN_CLIENT;
        warn!(
            client = %identifier,
            shared_bucket,
            retry_after = decision.retry_after,
            "rate limit exceeded"
        );
        return Err(AppError::RateLimited(decision));
    }
    Ok(decision)
}

fn quota_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_in.as_millis() as u64),
    );
    headers
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
