//! Extractores de autenticación.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use f0_core::Account;

use crate::error::AppError;
use crate::state::AppState;

/// Header con la clave de administración para ingesta de comisiones.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Cuenta dueña del token `Authorization: Bearer <token>`.
pub struct CurrentAccount(pub Account);

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let account = state.run(move |engine| engine.resolve_token(&token)).await?;
        Ok(CurrentAccount(account))
    }
}

/// Request autorizado con `X-Admin-Key`.
pub struct AdminKey;

impl FromRequestParts<AppState> for AdminKey {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_key.as_deref() else {
            return Err(AppError::Forbidden("admin endpoints are disabled"));
        };
        let provided = parts.headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
        match provided {
            Some(key) if key == expected => Ok(AdminKey),
            _ => Err(AppError::Forbidden("invalid admin key")),
        }
    }
}
