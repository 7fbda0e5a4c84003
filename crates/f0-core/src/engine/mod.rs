//! Fachada `ReferralEngine`: identidad, grafo de referidos, log de clicks,
//! ledger de comisiones, agregación de stats y CRM sobre un `LedgerStore`.

pub mod core;

pub use core::{Enrollment, JoinOutcome, ReferralEngine};

pub use crate::store::{InMemoryLedgerStore, LedgerStore};
