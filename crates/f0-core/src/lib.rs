//! f0-core: ledger de referidos y comisiones escalonadas.
//!
//! Contiene el modelo de dominio (cuentas, clicks, eventos de comisión,
//! sesiones, contactos, actividad), el resolvedor de tiers, el trait
//! `LedgerStore` con su backend en memoria y `ReferralEngine`, la fachada
//! que implementa las operaciones sobre cualquier store.
pub mod codes;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod license;
pub mod model;
pub mod money;
pub mod referral;
pub mod store;
pub mod tier;

pub use engine::{Enrollment, JoinOutcome, ReferralEngine};
pub use errors::LedgerError;
pub use license::LicenseSigner;
pub use model::{Account, AccountDraft, AccountId, AccountStats, Activity, ActivityAction, ClickEvent, ClickSource,
                CommissionDraft, CommissionEvent, Contact, ContactPatch, CreateOutcome, NewContact, Session, SessionGrant};
pub use money::{Money, Rate};
pub use store::{InMemoryLedgerStore, LedgerStore};
pub use tier::rate_for;
