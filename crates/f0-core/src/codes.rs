//! Generación de identificadores compartibles y normalización de email.
use uuid::Uuid;

use crate::constants::{REFERRAL_CODE_LEN, REFERRAL_CODE_PREFIX};
use crate::errors::LedgerError;

/// Código de referido nuevo: prefijo fijo + sufijo hex en mayúsculas tomado
/// de un UUIDv4. La unicidad la garantiza el store, no este generador.
pub fn generate_referral_code() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{REFERRAL_CODE_PREFIX}{}", &raw[..REFERRAL_CODE_LEN])
}

/// Token de sesión opaco (64 caracteres hex, 244 bits aleatorios).
pub fn generate_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Normaliza un email (trim + minúsculas) y aplica la validación mínima.
pub fn normalize_email(raw: &str) -> Result<String, LedgerError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(LedgerError::InvalidEmail),
    }
}
