//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL` y parámetros opcionales de pool.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

/// Ruta por defecto del archivo SQLite si `DATABASE_URL` no está definido.
pub const DEFAULT_DATABASE_URL: &str = "data/fortune0.db";

/// Espera máxima ante `SQLITE_BUSY` antes de devolver "database is locked".
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub busy_timeout_ms: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { url: DEFAULT_DATABASE_URL.to_string(),
               min_connections: 1,
               max_connections: 8,
               busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS }
    }
}

impl DbConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        let url = env::var("DATABASE_URL").ok()
                                          .filter(|v| !v.trim().is_empty())
                                          .unwrap_or(defaults.url);
        Self { url,
               min_connections: parse_var("DATABASE_MIN_CONNECTIONS").unwrap_or(defaults.min_connections),
               max_connections: parse_var("DATABASE_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
               busy_timeout_ms: parse_var("DATABASE_BUSY_TIMEOUT_MS").unwrap_or(defaults.busy_timeout_ms) }
    }

    /// Config apuntando a un archivo concreto (tests, CLI).
    pub fn for_path(path: impl Into<String>) -> Self {
        Self { url: path.into(),
               ..Self::default() }
    }
}

fn parse_var(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
