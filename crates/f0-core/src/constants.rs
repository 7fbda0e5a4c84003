//! Constantes del ledger.
//!
//! Los valores que participan en el cálculo de comisiones (tabla de tiers)
//! viven en `tier`; aquí quedan los parámetros de identidad y sesión.

/// Prefijo visible de los códigos de referido (`IK-XXXXXXXX`).
pub const REFERRAL_CODE_PREFIX: &str = "IK-";

/// Prefijo de las claves de licencia firmadas.
pub const LICENSE_KEY_PREFIX: &str = "IK-";

/// Largo del sufijo alfanumérico del código de referido.
pub const REFERRAL_CODE_LEN: usize = 8;

/// Intentos máximos para generar un código único antes de fallar con
/// `CodeGenerationExhausted`.
pub const MAX_CODE_ATTEMPTS: usize = 8;

/// Vigencia de un token de sesión desde su emisión.
pub const SESSION_TTL_DAYS: i64 = 28;

/// Tope superior aceptado para un monto individual (en centavos, 10 mil
/// millones de dólares). Con este tope la suma acumulada de una cuenta no
/// desborda `i64` antes de unos nueve millones de eventos máximos.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Cantidad de entradas devueltas por el feed de actividad.
pub const ACTIVITY_FEED_LIMIT: usize = 20;
