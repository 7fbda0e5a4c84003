use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;

/// Entrada del feed de actividad (append-only, best-effort).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub account_id: Option<AccountId>,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    Signup,
    Login,
    AffiliateJoined,
    Commission,
    ContactAdded,
    ContactUpdated,
    ContactDeleted,
}

impl ActivityAction {
    /// Nombre estable persistido en la columna `action`.
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityAction::Signup => "signup",
            ActivityAction::Login => "login",
            ActivityAction::AffiliateJoined => "affiliate_joined",
            ActivityAction::Commission => "commission",
            ActivityAction::ContactAdded => "contact_added",
            ActivityAction::ContactUpdated => "contact_updated",
            ActivityAction::ContactDeleted => "contact_deleted",
        }
    }
}
