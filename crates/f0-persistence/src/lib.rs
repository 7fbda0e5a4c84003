//! f0-persistence
//!
//! Implementación SQLite (Diesel + r2d2) de `LedgerStore`, con paridad 1:1
//! respecto al backend en memoria de `f0-core`.
//!
//! Módulos:
//! - `sqlite`: pool, reintentos, `SqliteLedgerStore` y `SqliteKv` (gate).
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use sqlite::{build_pool, build_pool_from_env, ConnectionProvider, PoolProvider, SqliteKv, SqliteLedgerStore,
                 SqlitePool};
