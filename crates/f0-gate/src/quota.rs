//! Cuota diaria del plan gratuito.
//!
//! El día es el calendario UTC (`YYYY-MM-DD`): la cuota se reinicia a las
//! 00:00 UTC, no hay ventana móvil.

use chrono::{DateTime, Duration, Utc};

/// Búsquedas gratuitas por día calendario.
pub const FREE_SEARCHES_PER_DAY: u32 = 3;

/// Vida del contador diario; cubre el día completo en cualquier huso.
pub const QUOTA_TTL_HOURS: i64 = 48;

/// Retención del log de búsquedas.
pub const SEARCH_LOG_TTL_DAYS: i64 = 30;

pub fn day_bucket(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

pub fn quota_ttl() -> Duration {
    Duration::hours(QUOTA_TTL_HOURS)
}

pub fn search_log_ttl() -> Duration {
    Duration::days(SEARCH_LOG_TTL_DAYS)
}

pub fn subscriber_key(email: &str) -> String {
    format!("sub:{email}")
}

pub fn quota_key(email: &str, day: &str) -> String {
    format!("quota:{email}:{day}")
}

pub fn search_key(day: &str, id: &uuid::Uuid) -> String {
    format!("search:{day}:{id}")
}

pub fn form_key(form: &str, id: &uuid::Uuid) -> String {
    format!("{}{id}", form_prefix(form))
}

pub fn form_prefix(form: &str) -> String {
    format!("form:{form}:")
}
