use axum::http::{HeaderMap, header};
use std::collections::HashMap;

use crate::error::AppError;
use crate::models::Role;

// Bearer token -> role. Empty means authentication is switched off.
pub struct Authenticator {
    tokens: HashMap<String, Role>,
}

impl Authenticator {
    pub fn new(supervisor_token: Option<String>, admin_token: Option<String>) -> Self {
        let mut tokens = HashMap::new();
        if let Some(token) = supervisor_token.filter(|t| !t.is_empty()) {
            tokens.insert(token, Role::Supervisor);
        }
        if let Some(token) = admin_token.filter(|t| !t.is_empty()) {
            tokens.insert(token, Role::Admin);
        }
        Self { tokens }
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Resolve the caller's role and check it against `required`.
    pub fn authorize(&self, headers: &HeaderMap, required: Role) -> Result<Role, AppError> {
        if !self.is_enabled() {
            return Ok(Role::Admin);
        }

        let role = bearer_token(headers)
            .and_then(|token| self.tokens.get(token))
            .copied()
            .ok_or(AppError::Unauthorized)?;

        if role < required {
            return Err(AppError::Forbidden);
        }
        Ok(role)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}
