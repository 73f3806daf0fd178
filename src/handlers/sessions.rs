use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

use super::{admit, parse_id, quota_headers, required};
use crate::error::AppError;
use crate::models::{CreateSessionRequest, NewSession, Role};
use crate::state::AppState;

// Everything the dashboard list view needs in one call
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Supervisor)?;

    Ok(Json(serde_json::json!({
        "fellows": state.store.fellows(),
        "supervisors": state.store.supervisors(),
        "sessions": state.store.sessions(),
    })))
}

pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Supervisor)?;

    parse_id(&id)
        .and_then(|id| state.store.session_detail(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Supervisor)?;
    let decision = admit(&state, &headers)?;

    let (Some(fellow_id), Some(supervisor_id), Some(date), Some(group_id), Some(transcript)) = (
        required(payload.fellow_id),
        required(payload.supervisor_id),
        required(payload.date),
        required(payload.group_id),
        required(payload.transcript),
    ) else {
        return Err(AppError::BadRequest(
            "Missing required fields: fellowId, supervisorId, date, groupId, transcript"
                .to_string(),
        ));
    };

    let date = parse_date(&date)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date: {date}")))?;

    let fellow = parse_id(&fellow_id)
        .and_then(|id| state.store.fellow(id))
        .ok_or_else(|| AppError::NotFound("Fellow not found".to_string()))?;
    let supervisor = parse_id(&supervisor_id)
        .and_then(|id| state.store.supervisor(id))
        .ok_or_else(|| AppError::NotFound("Supervisor not found".to_string()))?;

    let session = state.store.create_session(NewSession {
        fellow_id: fellow.id,
        supervisor_id: supervisor.id,
        date,
        group_id,
        transcript,
    });
    info!(session_id = %session.id, fellow = %fellow.name, "session created");

    let detail = state
        .store
        .session_detail(session.id)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    Ok((StatusCode::CREATED, quota_headers(&decision), Json(detail)))
}

// Accepts RFC 3339 timestamps or plain dates (midnight UTC)
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
