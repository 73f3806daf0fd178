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
use crate::models::{CreateFellowRequest, Role};
use crate::state::AppState;

pub async fn list_fellows_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.fellows())
}

pub async fn create_fellow_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateFellowRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Admin)?;

    let name = required(payload.name)
        .ok_or_else(|| AppError::BadRequest("Name is required".to_string()))?;

    let fellow = state.store.create_fellow(&name);
    info!(fellow_id = %fellow.id, "fellow created");
    Ok((StatusCode::CREATED, Json(fellow)))
}
