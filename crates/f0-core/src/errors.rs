//! Errores del ledger.
//!
//! Todos son recuperables en el borde del request: cada variante representa
//! una operación rechazada sin cambios parciales. `Storage` es el único
//! transitorio (el caller puede reintentar).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LedgerError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid or expired session token")]
    InvalidOrExpiredToken,
    #[error("invalid or expired license key")]
    InvalidLicenseKey,
    #[error("could not allocate a unique referral code")]
    CodeGenerationExhausted,
    #[error("unknown account")]
    UnknownAccount,
    #[error("amount must be finite and at least one cent")]
    InvalidAmount,
    #[error("order already recorded: {0}")]
    DuplicateOrder(String),
    #[error("contact not found")]
    ContactNotFound,
    #[error("invalid contact: {0}")]
    InvalidContact(String),
    #[error("storage unavailable (retryable): {0}")]
    Storage(String),
}

impl LedgerError {
    /// Indica si el caller puede reintentar la operación tal cual.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Storage(_))
    }
}
