use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use std::sync::Arc;
use tracing::{debug, info};

use super::{parse_id, required};
use crate::error::AppError;
use crate::models::{Role, ValidateRequest};
use crate::state::AppState;
use crate::store::StoreError;

pub async fn validate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ValidateRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Supervisor)?;
    debug!(?payload, "validate request");

    let (Some(raw_id), Some(status)) = (required(payload.session_id), payload.validated_status)
    else {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    };

    let session_id = parse_id(&raw_id).ok_or(StoreError::SessionNotFound)?;
    let validation = state.store.validate(session_id, status, payload.note)?;

    info!(%session_id, ?status, validated = validation.validated, "validation saved");
    Ok(Json(validation))
}
