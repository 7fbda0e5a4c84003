use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;
use crate::codes::generate_session_token;
use crate::constants::SESSION_TTL_DAYS;

/// Token bearer emitido por `authenticate`.
///
/// No hay barrido de expiración: un token vencido simplemente se rechaza al
/// resolverlo. Re-autenticar emite un token nuevo sin invalidar los previos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub account_id: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn issue(account_id: AccountId, now: DateTime<Utc>) -> Self {
        SessionGrant::new(now).bind(account_id)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Sesión todavía sin cuenta: viaja en el `AccountDraft` para que el store la
/// escriba en la misma unidad atómica que el alta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionGrant {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { token: generate_session_token(),
               issued_at: now,
               expires_at: now + Duration::days(SESSION_TTL_DAYS) }
    }

    pub fn bind(self, account_id: AccountId) -> Session {
        Session { token: self.token,
                  account_id,
                  issued_at: self.issued_at,
                  expires_at: self.expires_at }
    }
}
