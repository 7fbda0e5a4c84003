//! `SqliteLedgerStore`: backend durable de `LedgerStore`.

use chrono::{DateTime, Utc};
use diesel::dsl::{exists, select, sql};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::BigInt;
use f0_core::money::Money;
use f0_core::referral::attribute;
use f0_core::{Account, AccountDraft, AccountId, Activity, ClickEvent, ClickSource, CommissionDraft,
              CommissionEvent, Contact, ContactPatch, CreateOutcome, LedgerError, LedgerStore, NewContact, Session};
use log::debug;

use super::rows::{AccountRow, ActivityRow, CommissionRow, ContactRow, NewAccountRow, NewActivityRow, NewClickRow,
                  NewCommissionRow, NewContactRow, SessionRow};
use super::{with_retry, ConnectionProvider, PoolProvider, SqlitePool};
use crate::error::PersistenceError;
use crate::schema::{accounts, activity, click_events, commission_events, contacts, sessions};

/// Resultado interno de una transacción: el `Result` externo es de la base,
/// el interno es un rechazo de negocio (la transacción no escribió nada).
type TxResult<T> = Result<Result<T, LedgerError>, DieselError>;

/// Implementación SQLite de `LedgerStore`.
///
/// Responsabilidades:
/// - `create_account`: verificación de unicidad, resolución del referido e
///   insert en una única transacción `IMMEDIATE`.
/// - `append_commission`: lectura del acumulado previo, tarifado e insert en
///   una única transacción `IMMEDIATE`.
/// - Lecturas: consultas simples con reintento ante `SQLITE_BUSY`.
pub struct SqliteLedgerStore<P: ConnectionProvider = PoolProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> SqliteLedgerStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn read<T, F>(&self, mut f: F) -> Result<T, LedgerError>
        where F: FnMut(&mut SqliteConnection) -> QueryResult<T>
    {
        Ok(with_retry(|| {
            let mut conn = self.provider.connection()?;
            f(&mut *conn).map_err(PersistenceError::from)
        })?)
    }

    fn write<T, F>(&self, mut f: F) -> Result<T, LedgerError>
        where F: FnMut(&mut SqliteConnection) -> TxResult<T>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.immediate_transaction(|tx| f(tx)).map_err(PersistenceError::from)
        })?
    }
}

impl SqliteLedgerStore<PoolProvider> {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

fn code_exists(conn: &mut SqliteConnection, code: &str) -> QueryResult<bool> {
    select(exists(accounts::table.filter(accounts::referral_code.eq(code)))).get_result(conn)
}

fn account_exists(conn: &mut SqliteConnection, id: AccountId) -> QueryResult<bool> {
    select(exists(accounts::table.find(id))).get_result(conn)
}

impl<P: ConnectionProvider> LedgerStore for SqliteLedgerStore<P> {
    fn create_account(&self, draft: AccountDraft) -> Result<CreateOutcome, LedgerError> {
        debug!("create_account:start code={}", draft.referral_code);
        let outcome = self.write(|tx| {
            let email_taken = select(exists(accounts::table.filter(accounts::email.eq(&draft.email))))
                .get_result::<bool>(tx)?;
            if email_taken {
                return Ok(Ok(CreateOutcome::EmailTaken));
            }
            if code_exists(tx, &draft.referral_code)? {
                return Ok(Ok(CreateOutcome::CodeTaken));
            }
            let candidate = draft.referral.as_deref().map(str::trim).filter(|c| !c.is_empty());
            let resolves = match candidate {
                Some(code) => code_exists(tx, code)?,
                None => false,
            };
            let referred_by = attribute(candidate, &draft.referral_code, |_| resolves);
            let row: AccountRow = diesel::insert_into(accounts::table)
                .values(NewAccountRow { email: &draft.email,
                                        referral_code: &draft.referral_code,
                                        referred_by: referred_by.as_deref(),
                                        created_at: draft.created_at.naive_utc() })
                .returning(AccountRow::as_returning())
                .get_result(tx)?;
            if let Some(grant) = &draft.session {
                let session = grant.clone().bind(row.id);
                diesel::insert_into(sessions::table).values(SessionRow::from(&session)).execute(tx)?;
            }
            Ok(Ok(CreateOutcome::Created(row.into())))
        })?;
        if let CreateOutcome::Created(account) = &outcome {
            debug!("create_account:done id={} code={}", account.id, account.referral_code);
        }
        Ok(outcome)
    }

    fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        let row = self.read(|conn| {
                          accounts::table.find(id)
                                         .select(AccountRow::as_select())
                                         .first(conn)
                                         .optional()
                      })?;
        Ok(row.map(Account::from))
    }

    fn account_by_email(&self, email: &str) -> Result<Option<Account>, LedgerError> {
        let row = self.read(|conn| {
                          accounts::table.filter(accounts::email.eq(email))
                                         .select(AccountRow::as_select())
                                         .first(conn)
                                         .optional()
                      })?;
        Ok(row.map(Account::from))
    }

    fn account_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        let row = self.read(|conn| {
                          accounts::table.filter(accounts::referral_code.eq(code))
                                         .select(AccountRow::as_select())
                                         .first(conn)
                                         .optional()
                      })?;
        Ok(row.map(Account::from))
    }

    fn accounts_referred_by(&self, code: &str) -> Result<Vec<Account>, LedgerError> {
        let rows = self.read(|conn| {
                           accounts::table.filter(accounts::referred_by.eq(code))
                                          .order(accounts::id.asc())
                                          .select(AccountRow::as_select())
                                          .load(conn)
                       })?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    fn insert_session(&self, session: &Session) -> Result<(), LedgerError> {
        let row = SessionRow::from(session);
        self.read(|conn| diesel::insert_into(sessions::table).values(&row).execute(conn))?;
        Ok(())
    }

    fn session(&self, token: &str) -> Result<Option<Session>, LedgerError> {
        let row = self.read(|conn| {
                          sessions::table.find(token)
                                         .select(SessionRow::as_select())
                                         .first(conn)
                                         .optional()
                      })?;
        Ok(row.map(Session::from))
    }

    fn append_click(&self, code: &str, source: &ClickSource, at: DateTime<Utc>) -> Result<ClickEvent, LedgerError> {
        let row = NewClickRow { referral_code: code,
                                source_domain: source.source_domain.as_deref(),
                                visitor_hash: source.visitor_hash.as_deref(),
                                created_at: at.naive_utc() };
        let id = self.read(|conn| {
                         diesel::insert_into(click_events::table).values(&row)
                                                                 .returning(click_events::id)
                                                                 .get_result::<i64>(conn)
                     })?;
        Ok(row.into_event(id))
    }

    fn click_count(&self, code: &str) -> Result<u64, LedgerError> {
        let count = self.read(|conn| {
                            click_events::table.filter(click_events::referral_code.eq(code))
                                               .count()
                                               .get_result::<i64>(conn)
                        })?;
        Ok(count.unsigned_abs())
    }

    fn append_commission(&self,
                         account_id: AccountId,
                         amount: Money,
                         order_id: Option<&str>,
                         at: DateTime<Utc>)
                         -> Result<CommissionEvent, LedgerError> {
        debug!("append_commission:start account={account_id} amount={amount}");
        self.write(|tx| {
                if !account_exists(tx, account_id)? {
                    return Ok(Err(LedgerError::UnknownAccount));
                }
                if let Some(order) = order_id {
                    let taken = select(exists(commission_events::table.filter(commission_events::order_id.eq(order))))
                        .get_result::<bool>(tx)?;
                    if taken {
                        return Ok(Err(LedgerError::DuplicateOrder(order.to_string())));
                    }
                }
                let prior: i64 = commission_events::table
                    .filter(commission_events::account_id.eq(account_id))
                    .select(sql::<BigInt>("COALESCE(SUM(amount_cents), 0)"))
                    .get_result(tx)?;
                let draft = CommissionDraft::price(account_id, Money::from_cents(prior), amount, order_id, at);
                let id = diesel::insert_into(commission_events::table)
                    .values(NewCommissionRow { account_id,
                                               order_id: draft.order_id.as_deref(),
                                               amount_cents: draft.amount.cents(),
                                               rate_bps: draft.rate_applied.bps() as i32,
                                               commission_cents: draft.commission_amount.cents(),
                                               created_at: at.naive_utc() })
                    .returning(commission_events::id)
                    .get_result::<i64>(tx)?;
                Ok(Ok(draft.into_event(id)))
            })
    }

    fn commissions_for(&self, account_id: AccountId) -> Result<Vec<CommissionEvent>, LedgerError> {
        let rows = self.read(|conn| {
                           commission_events::table.filter(commission_events::account_id.eq(account_id))
                                                   .order(commission_events::id.asc())
                                                   .select(CommissionRow::as_select())
                                                   .load(conn)
                       })?;
        Ok(rows.into_iter().map(CommissionEvent::from).collect())
    }

    fn insert_contact(&self, owner: AccountId, contact: &NewContact, at: DateTime<Utc>) -> Result<Contact, LedgerError> {
        let row = self.read(|conn| {
                          diesel::insert_into(contacts::table)
                              .values(NewContactRow { account_id: owner,
                                                      name: contact.name.trim(),
                                                      email: contact.email.as_deref(),
                                                      phone: contact.phone.as_deref(),
                                                      company: contact.company.as_deref(),
                                                      notes: contact.notes.as_deref(),
                                                      created_at: at.naive_utc() })
                              .returning(ContactRow::as_returning())
                              .get_result(conn)
                      })?;
        Ok(row.into())
    }

    fn contacts_for(&self, owner: AccountId) -> Result<Vec<Contact>, LedgerError> {
        let rows = self.read(|conn| {
                           contacts::table.filter(contacts::account_id.eq(owner))
                                          .order(contacts::id.desc())
                                          .select(ContactRow::as_select())
                                          .load(conn)
                       })?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    fn update_contact(&self, owner: AccountId, id: i64, patch: &ContactPatch) -> Result<Option<Contact>, LedgerError> {
        self.write(|tx| {
                let current = contacts::table.filter(contacts::id.eq(id).and(contacts::account_id.eq(owner)))
                                             .select(ContactRow::as_select())
                                             .first(tx)
                                             .optional()?;
                let Some(row) = current else {
                    return Ok(Ok(None));
                };
                let mut contact = Contact::from(row);
                contact.apply(patch);
                diesel::update(contacts::table.find(id))
                    .set((contacts::name.eq(&contact.name),
                          contacts::email.eq(contact.email.as_deref()),
                          contacts::phone.eq(contact.phone.as_deref()),
                          contacts::company.eq(contact.company.as_deref()),
                          contacts::notes.eq(contact.notes.as_deref())))
                    .execute(tx)?;
                Ok(Ok(Some(contact)))
            })
    }

    fn delete_contact(&self, owner: AccountId, id: i64) -> Result<bool, LedgerError> {
        let deleted = self.read(|conn| {
                              diesel::delete(contacts::table.filter(contacts::id.eq(id)
                                                                                .and(contacts::account_id.eq(owner))))
                                  .execute(conn)
                          })?;
        Ok(deleted > 0)
    }

    fn append_activity(&self,
                       account_id: Option<AccountId>,
                       action: &str,
                       detail: &str,
                       at: DateTime<Utc>)
                       -> Result<(), LedgerError> {
        self.read(|conn| {
                diesel::insert_into(activity::table)
                    .values(NewActivityRow { account_id,
                                             action,
                                             detail,
                                             created_at: at.naive_utc() })
                    .execute(conn)
            })?;
        Ok(())
    }

    fn recent_activity(&self, account_id: AccountId, limit: usize) -> Result<Vec<Activity>, LedgerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.read(|conn| {
                           activity::table.filter(activity::account_id.eq(account_id))
                                          .order(activity::id.desc())
                                          .limit(limit)
                                          .select(ActivityRow::as_select())
                                          .load(conn)
                       })?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }
}
