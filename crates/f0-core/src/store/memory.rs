use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;

use super::LedgerStore;
use crate::errors::LedgerError;
use crate::model::{Account, AccountDraft, AccountId, Activity, ClickEvent, ClickSource, CommissionDraft,
                   CommissionEvent, Contact, ContactPatch, CreateOutcome, NewContact, Session};
use crate::money::Money;
use crate::referral::attribute;

#[derive(Default)]
struct AccountTable {
    rows: Vec<Account>,
    by_email: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
}

/// Ledger de una cuenta; su mutex es la sección crítica de `append_commission`.
type AccountLedger = Arc<Mutex<Vec<CommissionEvent>>>;

/// Backend en memoria (tests, demos, `F0_STORE=memory`).
///
/// Locks:
/// - Alta de cuentas: un `RwLock` sobre la tabla completa (alta atómica).
/// - Comisiones: un `Mutex` por cuenta dentro de un `DashMap`, de modo que
///   cuentas distintas no se bloquean entre sí.
/// - `order_ids` global para detectar órdenes repetidas entre cuentas.
pub struct InMemoryLedgerStore {
    accounts: RwLock<AccountTable>,
    sessions: DashMap<String, Session>,
    clicks: Mutex<Vec<ClickEvent>>,
    ledgers: DashMap<AccountId, AccountLedger>,
    order_ids: DashMap<String, AccountId>,
    contacts: RwLock<Vec<Contact>>,
    activity: Mutex<Vec<Activity>>,
    next_id: AtomicI64,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self { accounts: RwLock::new(AccountTable::default()),
               sessions: DashMap::new(),
               clicks: Mutex::new(Vec::new()),
               ledgers: DashMap::new(),
               order_ids: DashMap::new(),
               contacts: RwLock::new(Vec::new()),
               activity: Mutex::new(Vec::new()),
               next_id: AtomicI64::new(1) }
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::Storage("in-memory lock poisoned".into())
}

impl LedgerStore for InMemoryLedgerStore {
    fn create_account(&self, draft: AccountDraft) -> Result<CreateOutcome, LedgerError> {
        let mut table = self.accounts.write().map_err(poisoned)?;
        if table.by_email.contains_key(&draft.email) {
            return Ok(CreateOutcome::EmailTaken);
        }
        if table.by_code.contains_key(&draft.referral_code) {
            return Ok(CreateOutcome::CodeTaken);
        }
        let referred_by = attribute(draft.referral.as_deref(), &draft.referral_code, |code| {
            table.by_code.contains_key(code)
        });
        let idx = table.rows.len();
        let account = Account { id: idx as AccountId + 1,
                                email: draft.email,
                                referral_code: draft.referral_code,
                                referred_by,
                                created_at: draft.created_at };
        table.by_email.insert(account.email.clone(), idx);
        table.by_code.insert(account.referral_code.clone(), idx);
        table.rows.push(account.clone());
        // Dentro del write lock: la cuenta no es visible sin su sesión inicial.
        if let Some(grant) = draft.session {
            let session = grant.bind(account.id);
            self.sessions.insert(session.token.clone(), session);
        }
        debug!("create_account:done id={} code={}", account.id, account.referral_code);
        Ok(CreateOutcome::Created(account))
    }

    fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        let table = self.accounts.read().map_err(poisoned)?;
        let idx = id.checked_sub(1).and_then(|i| usize::try_from(i).ok());
        Ok(idx.and_then(|i| table.rows.get(i)).cloned())
    }

    fn account_by_email(&self, email: &str) -> Result<Option<Account>, LedgerError> {
        let table = self.accounts.read().map_err(poisoned)?;
        Ok(table.by_email.get(email).map(|&i| table.rows[i].clone()))
    }

    fn account_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        let table = self.accounts.read().map_err(poisoned)?;
        Ok(table.by_code.get(code).map(|&i| table.rows[i].clone()))
    }

    fn accounts_referred_by(&self, code: &str) -> Result<Vec<Account>, LedgerError> {
        let table = self.accounts.read().map_err(poisoned)?;
        Ok(table.rows
                .iter()
                .filter(|a| a.referred_by.as_deref() == Some(code))
                .cloned()
                .collect())
    }

    fn insert_session(&self, session: &Session) -> Result<(), LedgerError> {
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    fn session(&self, token: &str) -> Result<Option<Session>, LedgerError> {
        Ok(self.sessions.get(token).map(|s| s.value().clone()))
    }

    fn append_click(&self, code: &str, source: &ClickSource, at: DateTime<Utc>) -> Result<ClickEvent, LedgerError> {
        let event = ClickEvent { id: self.next_id(),
                                 referral_code: code.to_string(),
                                 source: source.clone(),
                                 created_at: at };
        self.clicks.lock().map_err(poisoned)?.push(event.clone());
        Ok(event)
    }

    fn click_count(&self, code: &str) -> Result<u64, LedgerError> {
        let clicks = self.clicks.lock().map_err(poisoned)?;
        Ok(clicks.iter().filter(|c| c.referral_code == code).count() as u64)
    }

    fn append_commission(&self,
                         account_id: AccountId,
                         amount: Money,
                         order_id: Option<&str>,
                         at: DateTime<Utc>)
                         -> Result<CommissionEvent, LedgerError> {
        if self.account(account_id)?.is_none() {
            return Err(LedgerError::UnknownAccount);
        }
        let ledger = Arc::clone(&self.ledgers.entry(account_id).or_default());
        let mut events = ledger.lock().map_err(poisoned)?;
        if let Some(order) = order_id {
            match self.order_ids.entry(order.to_string()) {
                Entry::Occupied(_) => return Err(LedgerError::DuplicateOrder(order.to_string())),
                Entry::Vacant(slot) => {
                    slot.insert(account_id);
                }
            }
        }
        let prior: Money = events.iter().map(|e| e.amount).sum();
        let event = CommissionDraft::price(account_id, prior, amount, order_id, at).into_event(self.next_id());
        events.push(event.clone());
        Ok(event)
    }

    fn commissions_for(&self, account_id: AccountId) -> Result<Vec<CommissionEvent>, LedgerError> {
        match self.ledgers.get(&account_id) {
            Some(ledger) => Ok(ledger.lock().map_err(poisoned)?.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn insert_contact(&self, owner: AccountId, contact: &NewContact, at: DateTime<Utc>) -> Result<Contact, LedgerError> {
        let row = Contact { id: self.next_id(),
                            account_id: owner,
                            name: contact.name.trim().to_string(),
                            email: contact.email.clone(),
                            phone: contact.phone.clone(),
                            company: contact.company.clone(),
                            notes: contact.notes.clone(),
                            created_at: at };
        self.contacts.write().map_err(poisoned)?.push(row.clone());
        Ok(row)
    }

    fn contacts_for(&self, owner: AccountId) -> Result<Vec<Contact>, LedgerError> {
        let contacts = self.contacts.read().map_err(poisoned)?;
        Ok(contacts.iter().rev().filter(|c| c.account_id == owner).cloned().collect())
    }

    fn update_contact(&self, owner: AccountId, id: i64, patch: &ContactPatch) -> Result<Option<Contact>, LedgerError> {
        let mut contacts = self.contacts.write().map_err(poisoned)?;
        Ok(contacts.iter_mut()
                   .find(|c| c.id == id && c.account_id == owner)
                   .map(|c| {
                       c.apply(patch);
                       c.clone()
                   }))
    }

    fn delete_contact(&self, owner: AccountId, id: i64) -> Result<bool, LedgerError> {
        let mut contacts = self.contacts.write().map_err(poisoned)?;
        let before = contacts.len();
        contacts.retain(|c| !(c.id == id && c.account_id == owner));
        Ok(contacts.len() != before)
    }

    fn append_activity(&self,
                       account_id: Option<AccountId>,
                       action: &str,
                       detail: &str,
                       at: DateTime<Utc>)
                       -> Result<(), LedgerError> {
        let entry = Activity { id: self.next_id(),
                               account_id,
                               action: action.to_string(),
                               detail: detail.to_string(),
                               created_at: at };
        self.activity.lock().map_err(poisoned)?.push(entry);
        Ok(())
    }

    fn recent_activity(&self, account_id: AccountId, limit: usize) -> Result<Vec<Activity>, LedgerError> {
        let activity = self.activity.lock().map_err(poisoned)?;
        Ok(activity.iter()
                   .rev()
                   .filter(|a| a.account_id == Some(account_id))
                   .take(limit)
                   .cloned()
                   .collect())
    }
}
