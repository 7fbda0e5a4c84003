//! fortune0: servidor HTTP del ledger de referidos.
//!
//! - `routes`: handlers de cuentas, links de referido, comisiones, CRM y gate.
//! - `auth`: extractores de sesión (Bearer) y clave de administración.
//! - `state`: engine compartido y despacho de operaciones bloqueantes.
//! - `config` / `error`: configuración por entorno y mapeo de errores a HTTP.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{AppConfig, StoreKind};
pub use error::{AppError, AppResult};
pub use server::{build_app, start_server};
pub use state::AppState;
