//! Modelo de dominio del ledger.
mod account;
mod activity;
mod click;
mod commission;
mod contact;
mod session;
mod stats;

pub use account::{Account, AccountDraft, AccountId, CreateOutcome};
pub use activity::{Activity, ActivityAction};
pub use click::{ClickEvent, ClickSource};
pub use commission::{CommissionDraft, CommissionEvent};
pub use contact::{Contact, ContactPatch, NewContact};
pub use session::{Session, SessionGrant};
pub use stats::AccountStats;
