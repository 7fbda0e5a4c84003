//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas del dominio de persistencia.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use f0_core::LedgerError;
use f0_gate::GateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("database busy (retryable): {0}")]
    Busy(String),
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(message),
                    DatabaseErrorKind::CheckViolation => Self::CheckViolation(message),
                    DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(message),
                    // SQLite reporta SQLITE_BUSY / SQLITE_LOCKED como kind desconocido.
                    _ if is_busy_message(&message) => Self::Busy(message),
                    other => Self::Unknown(format!("db error kind {other:?}: {message}")),
                }
            }
            DieselError::DeserializationError(e) => Self::Unknown(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::AlreadyInTransaction => Self::Unknown("already in transaction".into()),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

pub(crate) fn is_busy_message(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("database is locked") || m.contains("database table is locked") || m.contains("busy")
}

/// Cualquier fallo de persistencia que llega al engine es `Storage`: la
/// operación no escribió nada y el caller puede reintentar.
impl From<PersistenceError> for LedgerError {
    fn from(err: PersistenceError) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<PersistenceError> for GateError {
    fn from(err: PersistenceError) -> Self {
        GateError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_messages_are_busy() {
        assert!(is_busy_message("database is locked"));
        assert!(is_busy_message("SQLITE_BUSY"));
        assert!(!is_busy_message("no such table: accounts"));
    }

    #[test]
    fn maps_to_storage() {
        let err: LedgerError = PersistenceError::Busy("database is locked".into()).into();
        assert!(err.is_transient());
    }
}
