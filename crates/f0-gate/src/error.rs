use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum GateError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid field: {0}")]
    InvalidField(&'static str),
    #[error("kv store unavailable: {0}")]
    Store(String),
}
