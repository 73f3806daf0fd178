use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::{admit, parse_id, quota_headers, required};
use crate::analysis::analyze_transcript;
use crate::error::AppError;
use crate::metrics::LLM_LATENCY;
use crate::models::{AnalyzeRequest, Role};
use crate::state::AppState;

pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Supervisor)?;
    let decision = admit(&state, &headers)?;

    let raw_id = required(payload.session_id)
        .ok_or_else(|| AppError::BadRequest("sessionId is required".to_string()))?;
    let session = parse_id(&raw_id)
        .and_then(|id| state.store.session(id))
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let start_time = Instant::now();
    let result =
        analyze_transcript(state.llm.as_ref(), &state.retry_policy, &session.transcript).await;
    // failed and throttled calls count too
    LLM_LATENCY.observe(start_time.elapsed().as_secs_f64());
    let analysis = result?;

    let record = state.store.record_analysis(session.id, &analysis)?;
    info!(
        session_id = %session.id,
        risk = ?record.risk_flag,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "session analyzed"
    );

    Ok((StatusCode::OK, quota_headers(&decision), Json(analysis)))
}
