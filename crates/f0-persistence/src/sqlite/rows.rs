//! Filas Diesel y su mapeo a tipos del dominio.
//!
//! Los timestamps se guardan como `TIMESTAMP` sin zona (UTC implícito).

use chrono::NaiveDateTime;
use diesel::prelude::*;
use f0_core::money::{Money, Rate};
use f0_core::{Account, Activity, ClickEvent, ClickSource, CommissionEvent, Contact, Session};

use crate::schema::{accounts, activity, click_events, commission_events, contacts, sessions};

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = accounts)]
pub struct AccountRow {
    pub id: i64,
    pub email: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account { id: row.id,
                  email: row.email,
                  referral_code: row.referral_code,
                  referred_by: row.referred_by,
                  created_at: row.created_at.and_utc() }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = accounts)]
pub struct NewAccountRow<'a> {
    pub email: &'a str,
    pub referral_code: &'a str,
    pub referred_by: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = sessions)]
pub struct SessionRow {
    pub token: String,
    pub account_id: i64,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl From<&Session> for SessionRow {
    fn from(s: &Session) -> Self {
        SessionRow { token: s.token.clone(),
                     account_id: s.account_id,
                     issued_at: s.issued_at.naive_utc(),
                     expires_at: s.expires_at.naive_utc() }
    }
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session { token: row.token,
                  account_id: row.account_id,
                  issued_at: row.issued_at.and_utc(),
                  expires_at: row.expires_at.and_utc() }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = click_events)]
pub struct NewClickRow<'a> {
    pub referral_code: &'a str,
    pub source_domain: Option<&'a str>,
    pub visitor_hash: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

impl NewClickRow<'_> {
    pub fn into_event(self, id: i64) -> ClickEvent {
        ClickEvent { id,
                     referral_code: self.referral_code.to_string(),
                     source: ClickSource { source_domain: self.source_domain.map(str::to_string),
                                           visitor_hash: self.visitor_hash.map(str::to_string) },
                     created_at: self.created_at.and_utc() }
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = commission_events)]
pub struct CommissionRow {
    pub id: i64,
    pub account_id: i64,
    pub order_id: Option<String>,
    pub amount_cents: i64,
    pub rate_bps: i32,
    pub commission_cents: i64,
    pub created_at: NaiveDateTime,
}

impl From<CommissionRow> for CommissionEvent {
    fn from(row: CommissionRow) -> Self {
        CommissionEvent { id: row.id,
                          account_id: row.account_id,
                          order_id: row.order_id,
                          amount: Money::from_cents(row.amount_cents),
                          // CHECK (rate_bps > 0) garantiza el rango.
                          rate_applied: Rate::from_bps(row.rate_bps.unsigned_abs()),
                          commission_amount: Money::from_cents(row.commission_cents),
                          created_at: row.created_at.and_utc() }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = commission_events)]
pub struct NewCommissionRow<'a> {
    pub account_id: i64,
    pub order_id: Option<&'a str>,
    pub amount_cents: i64,
    pub rate_bps: i32,
    pub commission_cents: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = contacts)]
pub struct ContactRow {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact { id: row.id,
                  account_id: row.account_id,
                  name: row.name,
                  email: row.email,
                  phone: row.phone,
                  company: row.company,
                  notes: row.notes,
                  created_at: row.created_at.and_utc() }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = contacts)]
pub struct NewContactRow<'a> {
    pub account_id: i64,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub company: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = activity)]
pub struct ActivityRow {
    pub id: i64,
    pub account_id: Option<i64>,
    pub action: String,
    pub detail: String,
    pub created_at: NaiveDateTime,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Activity { id: row.id,
                   account_id: row.account_id,
                   action: row.action,
                   detail: row.detail,
                   created_at: row.created_at.and_utc() }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = activity)]
pub struct NewActivityRow<'a> {
    pub account_id: Option<i64>,
    pub action: &'a str,
    pub detail: &'a str,
    pub created_at: NaiveDateTime,
}
