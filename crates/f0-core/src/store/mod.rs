//! Trait `LedgerStore` y backend en memoria.
//!
//! Contrato común a todos los backends:
//! - `create_account` es atómico: verificación de email/código, resolución
//!   del referido e inserción ocurren en una única unidad indivisible.
//! - `append_commission` serializa por cuenta la secuencia leer-acumulado ->
//!   tarifar -> anexar (ver `CommissionDraft::price`); cuentas distintas no
//!   deben bloquearse entre sí salvo limitación del motor subyacente.
//! - Accounts, clicks y comisiones son append-only: no hay updates ni deletes.
mod memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::LedgerError;
use crate::model::{Account, AccountDraft, AccountId, Activity, ClickEvent, ClickSource, CommissionEvent, Contact,
                   ContactPatch, CreateOutcome, NewContact, Session};
use crate::money::Money;

pub use memory::InMemoryLedgerStore;

pub trait LedgerStore: Send + Sync {
    /// Inserta una cuenta resolviendo `draft.referral` con `referral::attribute`.
    fn create_account(&self, draft: AccountDraft) -> Result<CreateOutcome, LedgerError>;
    fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError>;
    fn account_by_email(&self, email: &str) -> Result<Option<Account>, LedgerError>;
    fn account_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError>;
    /// Cuentas cuyo `referred_by` es `code`, en orden de alta.
    fn accounts_referred_by(&self, code: &str) -> Result<Vec<Account>, LedgerError>;

    fn insert_session(&self, session: &Session) -> Result<(), LedgerError>;
    fn session(&self, token: &str) -> Result<Option<Session>, LedgerError>;

    fn append_click(&self, code: &str, source: &ClickSource, at: DateTime<Utc>) -> Result<ClickEvent, LedgerError>;
    fn click_count(&self, code: &str) -> Result<u64, LedgerError>;

    /// Sección crítica por cuenta. Falla con `UnknownAccount` si la cuenta no
    /// existe y con `DuplicateOrder` si `order_id` ya fue registrado.
    fn append_commission(&self,
                         account_id: AccountId,
                         amount: Money,
                         order_id: Option<&str>,
                         at: DateTime<Utc>)
                         -> Result<CommissionEvent, LedgerError>;
    /// Eventos de la cuenta, del más antiguo al más reciente.
    fn commissions_for(&self, account_id: AccountId) -> Result<Vec<CommissionEvent>, LedgerError>;

    fn insert_contact(&self, owner: AccountId, contact: &NewContact, at: DateTime<Utc>) -> Result<Contact, LedgerError>;
    /// Contactos de la cuenta, del más reciente al más antiguo.
    fn contacts_for(&self, owner: AccountId) -> Result<Vec<Contact>, LedgerError>;
    fn update_contact(&self, owner: AccountId, id: i64, patch: &ContactPatch) -> Result<Option<Contact>, LedgerError>;
    fn delete_contact(&self, owner: AccountId, id: i64) -> Result<bool, LedgerError>;

    fn append_activity(&self,
                       account_id: Option<AccountId>,
                       action: &str,
                       detail: &str,
                       at: DateTime<Utc>)
                       -> Result<(), LedgerError>;
    /// Últimas `limit` entradas, de la más reciente a la más antigua.
    fn recent_activity(&self, account_id: AccountId, limit: usize) -> Result<Vec<Activity>, LedgerError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    fn create_account(&self, draft: AccountDraft) -> Result<CreateOutcome, LedgerError> {
        (**self).create_account(draft)
    }
    fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        (**self).account(id)
    }
    fn account_by_email(&self, email: &str) -> Result<Option<Account>, LedgerError> {
        (**self).account_by_email(email)
    }
    fn account_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        (**self).account_by_code(code)
    }
    fn accounts_referred_by(&self, code: &str) -> Result<Vec<Account>, LedgerError> {
        (**self).accounts_referred_by(code)
    }
    fn insert_session(&self, session: &Session) -> Result<(), LedgerError> {
        (**self).insert_session(session)
    }
    fn session(&self, token: &str) -> Result<Option<Session>, LedgerError> {
        (**self).session(token)
    }
    fn append_click(&self, code: &str, source: &ClickSource, at: DateTime<Utc>) -> Result<ClickEvent, LedgerError> {
        (**self).append_click(code, source, at)
    }
    fn click_count(&self, code: &str) -> Result<u64, LedgerError> {
        (**self).click_count(code)
    }
    fn append_commission(&self,
                         account_id: AccountId,
                         amount: Money,
                         order_id: Option<&str>,
                         at: DateTime<Utc>)
                         -> Result<CommissionEvent, LedgerError> {
        (**self).append_commission(account_id, amount, order_id, at)
    }
    fn commissions_for(&self, account_id: AccountId) -> Result<Vec<CommissionEvent>, LedgerError> {
        (**self).commissions_for(account_id)
    }
    fn insert_contact(&self, owner: AccountId, contact: &NewContact, at: DateTime<Utc>) -> Result<Contact, LedgerError> {
        (**self).insert_contact(owner, contact, at)
    }
    fn contacts_for(&self, owner: AccountId) -> Result<Vec<Contact>, LedgerError> {
        (**self).contacts_for(owner)
    }
    fn update_contact(&self, owner: AccountId, id: i64, patch: &ContactPatch) -> Result<Option<Contact>, LedgerError> {
        (**self).update_contact(owner, id, patch)
    }
    fn delete_contact(&self, owner: AccountId, id: i64) -> Result<bool, LedgerError> {
        (**self).delete_contact(owner, id)
    }
    fn append_activity(&self,
                       account_id: Option<AccountId>,
                       action: &str,
                       detail: &str,
                       at: DateTime<Utc>)
                       -> Result<(), LedgerError> {
        (**self).append_activity(account_id, action, detail, at)
    }
    fn recent_activity(&self, account_id: AccountId, limit: usize) -> Result<Vec<Activity>, LedgerError> {
        (**self).recent_activity(account_id, limit)
    }
}
