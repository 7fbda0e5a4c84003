//! Despacho de `GateRequest` sobre un `KvStore`.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::GateError;
use crate::kv::KvStore;
use crate::quota::{day_bucket, form_key, form_prefix, quota_key, quota_ttl, search_key, search_log_ttl, subscriber_key,
                   FREE_SEARCHES_PER_DAY};
use crate::request::{GateRequest, GateResponse, Plan};

/// Registro persistido bajo `sub:<email>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Subscriber {
    plan: Plan,
    updated_at: DateTime<Utc>,
}

/// Envío de formulario tal como se guardó bajo `form:<form>:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub fields: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

pub struct Gate<K: KvStore> {
    kv: K,
}

impl<K: KvStore> Gate<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn handle(&self, request: GateRequest) -> Result<GateResponse, GateError> {
        self.handle_at(request, Utc::now())
    }

    pub fn handle_at(&self, request: GateRequest, now: DateTime<Utc>) -> Result<GateResponse, GateError> {
        debug!("gate:{}", request.action());
        match request {
            GateRequest::SyncSubscriber { email, plan } => self.sync_subscriber(&email, plan, now),
            GateRequest::CheckAccess { email } => self.check_access(&email, now),
            GateRequest::Search { email, query } => self.search(&email, &query, now),
            GateRequest::SubmitForm { email, form, fields } => self.submit_form(&email, &form, fields, now),
        }
    }

    fn sync_subscriber(&self, email: &str, plan: Plan, now: DateTime<Utc>) -> Result<GateResponse, GateError> {
        let email = normalize_email(email)?;
        let record = Subscriber { plan,
                                  updated_at: now };
        self.kv.put(&subscriber_key(&email), to_json(&record)?, None, now)?;
        Ok(GateResponse::Synced { synced: true,
                                  plan })
    }

    fn check_access(&self, email: &str, now: DateTime<Utc>) -> Result<GateResponse, GateError> {
        let email = normalize_email(email)?;
        let plan = self.plan_of(&email, now)?;
        if plan == Plan::Pro {
            return Ok(GateResponse::Access { access: true,
                                             plan,
                                             remaining_free: None });
        }
        let remaining = self.remaining_free(&email, now)?;
        Ok(GateResponse::Access { access: remaining > 0,
                                  plan,
                                  remaining_free: Some(remaining) })
    }

    fn search(&self, email: &str, query: &str, now: DateTime<Utc>) -> Result<GateResponse, GateError> {
        let email = normalize_email(email)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(GateError::InvalidField("query"));
        }
        let day = day_bucket(now);
        let remaining_free = match self.plan_of(&email, now)? {
            Plan::Pro => None,
            Plan::Free => {
                let used = self.kv
                               .increment_below(&quota_key(&email, &day), FREE_SEARCHES_PER_DAY, quota_ttl(), now)?;
                match used {
                    Some(used) => Some(FREE_SEARCHES_PER_DAY - used),
                    None => {
                        debug!("gate:search quota exhausted day={day}");
                        return Ok(GateResponse::Search { allowed: false,
                                                         remaining_free: Some(0) });
                    }
                }
            }
        };
        let entry = json!({ "email": email, "query": query, "at": now });
        self.kv.put(&search_key(&day, &Uuid::new_v4()), entry.to_string(), Some(search_log_ttl()), now)?;
        Ok(GateResponse::Search { allowed: true,
                                  remaining_free })
    }

    fn submit_form(&self,
                   email: &str,
                   form: &str,
                   fields: Map<String, Value>,
                   now: DateTime<Utc>)
                   -> Result<GateResponse, GateError> {
        let email = normalize_email(email)?;
        let form = form.trim();
        if form.is_empty() || form.contains(':') {
            return Err(GateError::InvalidField("form"));
        }
        let id = Uuid::new_v4();
        let entry = json!({ "email": email, "fields": fields, "submitted_at": now });
        self.kv.put(&form_key(form, &id), entry.to_string(), None, now)?;
        Ok(GateResponse::Submitted { ok: true,
                                     id: id.to_string() })
    }

    /// Envíos de `form`, del más antiguo al más reciente. Entradas ilegibles
    /// se omiten con un warning.
    pub fn form_submissions(&self, form: &str, now: DateTime<Utc>) -> Result<Vec<FormSubmission>, GateError> {
        let form = form.trim();
        if form.is_empty() || form.contains(':') {
            return Err(GateError::InvalidField("form"));
        }
        let prefix = form_prefix(form);
        let mut submissions = Vec::new();
        for key in self.kv.keys_with_prefix(&prefix, now)? {
            let Some(raw) = self.kv.get(&key, now)? else {
                continue;
            };
            match serde_json::from_str::<FormSubmission>(&raw) {
                Ok(mut submission) => {
                    submission.id = key[prefix.len()..].to_string();
                    submissions.push(submission);
                }
                Err(e) => warn!("gate: unreadable form entry key={key} err={e}"),
            }
        }
        submissions.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(submissions)
    }

    /// Barrido de claves vencidas (contadores y log de búsquedas).
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, GateError> {
        let purged = self.kv.purge_expired(now)?;
        if purged > 0 {
            debug!("gate:purge removed={purged}");
        }
        Ok(purged)
    }

    /// Plan del suscriptor; sin registro cuenta como `free`.
    fn plan_of(&self, email: &str, now: DateTime<Utc>) -> Result<Plan, GateError> {
        let Some(raw) = self.kv.get(&subscriber_key(email), now)? else {
            return Ok(Plan::Free);
        };
        match serde_json::from_str::<Subscriber>(&raw) {
            Ok(record) => Ok(record.plan),
            Err(e) => {
                warn!("gate: unreadable subscriber record err={e}");
                Ok(Plan::Free)
            }
        }
    }

    fn remaining_free(&self, email: &str, now: DateTime<Utc>) -> Result<u32, GateError> {
        let used = self.kv
                       .get(&quota_key(email, &day_bucket(now)), now)?
                       .and_then(|v| v.parse::<u32>().ok())
                       .unwrap_or(0);
        Ok(FREE_SEARCHES_PER_DAY.saturating_sub(used))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, GateError> {
    serde_json::to_string(value).map_err(|e| GateError::Store(e.to_string()))
}

fn normalize_email(email: &str) -> Result<String, GateError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(':') => Ok(email),
        _ => Err(GateError::InvalidEmail),
    }
}
