//! f0-gate: servicio auxiliar de acceso sobre un almacén clave-valor.
//!
//! Un único endpoint recibe requests etiquetados por `action` (ver
//! `GateRequest`); cada variante tiene su propio esquema validado al
//! deserializar, de modo que acciones desconocidas se rechazan sin tocar el
//! almacén.

pub mod error;
pub mod kv;
pub mod quota;
pub mod request;
pub mod service;

pub use error::GateError;
pub use kv::{InMemoryKv, KvStore};
pub use request::{GateRequest, GateResponse, Plan};
pub use service::{FormSubmission, Gate};
