//! Implementación SQLite (Diesel) de `LedgerStore`.
//!
//! Objetivo general del módulo:
//! - Proveer una capa de persistencia durable con paridad 1:1 respecto al
//!   backend en memoria.
//! - Aislar completamente el mapeo dominio ↔ filas de DB de `f0-core`.
//!
//! Concurrencia:
//! - Toda escritura que deba ser atómica (alta de cuenta, append de comisión)
//!   corre en `BEGIN IMMEDIATE`: SQLite toma el lock de escritura al abrir la
//!   transacción, de modo que la lectura del acumulado previo y el insert no
//!   pueden intercalarse con otro escritor.
//! - SQLite serializa escritores a nivel de archivo: cuentas distintas
//!   también esperan entre sí. Es la limitación del motor, no del contrato.
//! - `SQLITE_BUSY` se trata como transitorio: `busy_timeout` en cada conexión
//!   y, además, reintento con backoff (`with_retry`).

mod kv;
mod rows;
mod store;

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

pub use kv::SqliteKv;
pub use store::SqliteLedgerStore;

/// Alias de tipo para el pool r2d2 de conexiones SQLite.
///
/// Al construirlo se corre automáticamente el set de migraciones pendientes
/// (una sola vez).
pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub type PooledConn = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Contrato:
/// - Debe devolver una conexión válida o `PersistenceError::TransientIo` en
///   caso de error.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PooledConn, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `SqlitePool`.
pub struct PoolProvider {
    pub pool: SqlitePool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PooledConn, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// PRAGMAs aplicados a cada conexión nueva del pool.
#[derive(Debug)]
struct ConnectionPragmas {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!("PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL; \
                                     PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;",
                                    self.busy_timeout_ms))
            .map_err(r2d2::Error::QueryError)
    }
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
fn is_retryable(e: &PersistenceError) -> bool {
    matches!(e, PersistenceError::Busy(_) | PersistenceError::TransientIo(_))
}

/// Retry simple con backoff lineal corto (hasta 3 reintentos).
///
/// Política:
/// - Backoff: 15ms, 30ms, 45ms.
/// - Logs: se emite `warn!` por intento.
///
/// No altera semántica de negocio; sólo repite la unidad de trabajo provista
/// por `f`, que debe ser una transacción completa.
pub(crate) fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Construye un pool r2d2 y ejecuta migraciones pendientes.
///
/// Comportamiento:
/// - Si `min_size > max_size`, usa `min_size = max_size`.
/// - Crea el directorio padre del archivo si no existe.
/// - Devuelve `PersistenceError::TransientIo` ante errores del pool/manager.
pub fn build_pool(cfg: &DbConfig) -> Result<SqlitePool, PersistenceError> {
    let max_size = cfg.max_connections.max(1);
    let min_size = cfg.min_connections.max(1);
    if min_size > max_size {
        warn!("build_pool: min_size > max_size ({min_size} > {max_size}), ajustando min=max");
    }
    ensure_parent_dir(&cfg.url)?;
    let manager = ConnectionManager::<SqliteConnection>::new(&cfg.url);
    let pool = r2d2::Pool::builder().min_idle(Some(min_size.min(max_size)))
                                    .max_size(max_size)
                                    .connection_customizer(Box::new(ConnectionPragmas { busy_timeout_ms:
                                                                                            cfg.busy_timeout_ms }))
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    debug!("build_pool:done url={} max={max_size}", cfg.url);
    Ok(pool)
}

/// Carga `.env`, lee configuración (DATABASE_URL, tamaños) y construye un
/// pool ya migrado.
pub fn build_pool_from_env() -> Result<SqlitePool, PersistenceError> {
    crate::config::init_dotenv();
    build_pool(&DbConfig::from_env())
}

fn ensure_parent_dir(path: &str) -> Result<(), PersistenceError> {
    if path == ":memory:" || path.starts_with("file:") {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| PersistenceError::TransientIo(format!("create {dir:?}: {e}")))
        }
        _ => Ok(()),
    }
}
