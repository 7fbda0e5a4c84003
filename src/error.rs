//! Errores HTTP del servidor.
//!
//! Cada error de dominio se traduce a un status y un cuerpo JSON
//! `{ "error", "code" }`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use f0_core::LedgerError;
use f0_gate::GateError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Ledger(e) => match e {
                LedgerError::DuplicateEmail => (StatusCode::CONFLICT, "DUPLICATE_EMAIL"),
                LedgerError::DuplicateOrder(_) => (StatusCode::CONFLICT, "DUPLICATE_ORDER"),
                LedgerError::InvalidOrExpiredToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
                LedgerError::InvalidLicenseKey => (StatusCode::UNAUTHORIZED, "INVALID_LICENSE_KEY"),
                LedgerError::UnknownAccount => (StatusCode::NOT_FOUND, "UNKNOWN_ACCOUNT"),
                LedgerError::ContactNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                LedgerError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
                LedgerError::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
                LedgerError::InvalidContact(_) => (StatusCode::BAD_REQUEST, "INVALID_CONTACT"),
                LedgerError::CodeGenerationExhausted => (StatusCode::SERVICE_UNAVAILABLE, "CODE_EXHAUSTED"),
                LedgerError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE"),
            },
            AppError::Gate(e) => match e {
                GateError::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
                GateError::InvalidField(_) => (StatusCode::BAD_REQUEST, "INVALID_FIELD"),
                GateError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE"),
            },
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::warn!(%status, code, "request failed: {self}");
        }
        let body = ErrorResponse { error: self.to_string(),
                                   code };
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return (status, [(header::RETRY_AFTER, "1")], Json(body)).into_response();
        }
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_statuses() {
        let cases = [(LedgerError::DuplicateEmail, StatusCode::CONFLICT),
                     (LedgerError::DuplicateOrder("o".into()), StatusCode::CONFLICT),
                     (LedgerError::InvalidOrExpiredToken, StatusCode::UNAUTHORIZED),
                     (LedgerError::InvalidLicenseKey, StatusCode::UNAUTHORIZED),
                     (LedgerError::UnknownAccount, StatusCode::NOT_FOUND),
                     (LedgerError::InvalidAmount, StatusCode::BAD_REQUEST),
                     (LedgerError::CodeGenerationExhausted, StatusCode::SERVICE_UNAVAILABLE),
                     (LedgerError::Storage("locked".into()), StatusCode::SERVICE_UNAVAILABLE)];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn storage_errors_advertise_retry() {
        let response = AppError::from(LedgerError::Storage("locked".into())).into_response();
        assert_eq!(response.headers().get(header::RETRY_AFTER).map(|v| v.as_bytes()), Some(&b"1"[..]));
    }
}
