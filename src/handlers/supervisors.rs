use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

use super::required;
use crate::error::AppError;
use crate::models::{CreateSupervisorRequest, Role};
use crate::state::AppState;

pub async fn list_supervisors_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Supervisor)?;
    Ok(Json(state.store.supervisors()))
}

pub async fn create_supervisor_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateSupervisorRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Admin)?;

    let (Some(name), Some(email)) = (required(payload.name), required(payload.email)) else {
        return Err(AppError::BadRequest("Name and email are required".to_string()));
    };
    if state.store.supervisor_by_email(&email).is_some() {
        return Err(AppError::Conflict(
            "A supervisor with this email already exists".to_string(),
        ));
    }

    let supervisor = state.store.create_supervisor(&name, &email, Role::Supervisor);
    info!(supervisor_id = %supervisor.id, "supervisor created");
    Ok((StatusCode::CREATED, Json(supervisor)))
}
