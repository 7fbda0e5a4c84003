//! Requests y respuestas del endpoint del gate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

/// Request etiquetado por `action`. Cada variante exige sus propios campos;
/// una acción desconocida o un campo faltante falla al deserializar.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GateRequest {
    SyncSubscriber {
        email: String,
        plan: Plan,
    },
    CheckAccess {
        email: String,
    },
    Search {
        email: String,
        query: String,
    },
    SubmitForm {
        email: String,
        form: String,
        #[serde(default)]
        fields: Map<String, Value>,
    },
}

impl GateRequest {
    pub fn action(&self) -> &'static str {
        match self {
            GateRequest::SyncSubscriber { .. } => "sync_subscriber",
            GateRequest::CheckAccess { .. } => "check_access",
            GateRequest::Search { .. } => "search",
            GateRequest::SubmitForm { .. } => "submit_form",
        }
    }
}

/// `remaining_free` es `null` para `pro` (sin límite).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GateResponse {
    Synced {
        synced: bool,
        plan: Plan,
    },
    Access {
        access: bool,
        plan: Plan,
        remaining_free: Option<u32>,
    },
    Search {
        allowed: bool,
        remaining_free: Option<u32>,
    },
    Submitted {
        ok: bool,
        id: String,
    },
}
