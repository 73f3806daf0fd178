use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "stats": {
            "sessions": state.store.session_count(),
            "fellows": state.store.fellow_count(),
            "rateLimitEntries": state.rate_limiter.len(),
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
