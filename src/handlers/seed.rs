use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::Role;
use crate::state::AppState;

pub async fn seed_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.auth.authorize(&headers, Role::Admin)?;

    let report = state.store.seed_defaults();
    let message = if report.fellows_created == 0 && report.supervisors_created == 0 {
        "Database already seeded"
    } else {
        "Database seeded successfully"
    };

    Ok(Json(serde_json::json!({
        "message": message,
        "fellowsCreated": report.fellows_created,
        "supervisorsCreated": report.supervisors_created,
        "fellows": state.store.fellow_count(),
    })))
}
