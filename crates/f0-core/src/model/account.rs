//! Cuentas e intención de alta.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionGrant;

/// Identificador opaco y estable de una cuenta (asignado por el store).
pub type AccountId = i64;

/// Cuenta registrada.
///
/// Invariantes:
/// - `email` único y normalizado (minúsculas).
/// - `referral_code` único, generado al crear la cuenta, inmutable.
/// - `referred_by` apunta a un `referral_code` existente distinto del propio;
///   se fija sólo al crear y nunca cambia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Datos para crear una cuenta. `referral` es el código candidato tal como
/// llegó; el store lo resuelve (o descarta) dentro de la transacción de alta.
/// Si trae `session`, el store la inserta en esa misma transacción.
#[derive(Debug, Clone)]
pub struct AccountDraft {
    pub email: String,
    pub referral_code: String,
    pub referral: Option<String>,
    pub session: Option<SessionGrant>,
    pub created_at: DateTime<Utc>,
}

/// Resultado de un intento de alta en el store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Account),
    /// El email ya existe; nada fue escrito.
    EmailTaken,
    /// El código generado colisionó; el caller puede reintentar con otro.
    CodeTaken,
}
