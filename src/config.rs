//! Configuración central del servidor.
//! Carga variables de entorno (.env) y expone una estructura inmutable (`CONFIG`).

use std::env;
use std::fmt;
use std::time::Duration;

use f0_persistence::DbConfig;
use once_cell::sync::Lazy;
use tracing::{info, warn};

/// Backend del ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Sqlite => "sqlite",
            StoreKind::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Clave para `POST /api/commissions`; sin clave el endpoint queda deshabilitado.
    pub admin_key: Option<String>,
    /// Base pública de los links de referido (`<base_url>/r/<code>`).
    pub base_url: String,
    pub store: StoreKind,
    pub database: DbConfig,
    /// Secreto HMAC de las claves de licencia (`F0_LICENSE_SECRET`).
    pub license_secret: Option<String>,
    /// Período del barrido de claves vencidas del gate.
    pub purge_interval: Duration,
}

pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60 * 60;

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

impl AppConfig {
    pub fn from_env() -> Self {
        f0_persistence::init_dotenv();
        let port = env::var("PORT").or_else(|_| env::var("F0_PORT"))
                                   .ok()
                                   .and_then(|v| {
                                       v.parse::<u16>()
                                        .map_err(|e| warn!("Invalid PORT value {v:?}: {e}, using default"))
                                        .ok()
                                   })
                                   .unwrap_or(8080);
        let store = match env::var("F0_STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            Ok("sqlite") | Err(_) => StoreKind::Sqlite,
            Ok(other) => {
                warn!("Invalid F0_STORE value {other:?}, using sqlite");
                StoreKind::Sqlite
            }
        };
        let admin_key = env::var("F0_ADMIN_KEY").ok().filter(|k| !k.trim().is_empty());
        if admin_key.is_none() {
            info!("F0_ADMIN_KEY not set, admin endpoints disabled");
        }
        let base_url = env::var("F0_BASE_URL").ok()
                                              .map(|u| u.trim_end_matches('/').to_string())
                                              .filter(|u| !u.is_empty())
                                              .unwrap_or_else(|| format!("http://localhost:{port}"));
        let license_secret = env::var("F0_LICENSE_SECRET").ok().filter(|s| !s.trim().is_empty());
        if license_secret.is_none() {
            warn!("F0_LICENSE_SECRET not set, license keys signed with the development secret");
        }
        let purge_secs = env::var("F0_PURGE_INTERVAL_SECS").ok()
                                                           .and_then(|v| {
                                                               v.parse::<u64>()
                                                                .ok()
                                                                .filter(|s| *s > 0)
                                                                .or_else(|| {
                                                                    warn!("Invalid F0_PURGE_INTERVAL_SECS value {v:?}, \
                                                                           using default");
                                                                    None
                                                                })
                                                           })
                                                           .unwrap_or(DEFAULT_PURGE_INTERVAL_SECS);
        Self { port,
               admin_key,
               base_url,
               store,
               database: DbConfig::from_env(),
               license_secret,
               purge_interval: Duration::from_secs(purge_secs) }
    }

    /// Configuración en memoria para tests y demos.
    pub fn in_memory(admin_key: Option<&str>) -> Self {
        Self { port: 0,
               admin_key: admin_key.map(str::to_string),
               base_url: "http://localhost".to_string(),
               store: StoreKind::Memory,
               database: DbConfig::default(),
               license_secret: None,
               purge_interval: Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECS) }
    }

    pub fn share_url(&self, code: &str) -> String {
        format!("{}/r/{code}", self.base_url)
    }
}
