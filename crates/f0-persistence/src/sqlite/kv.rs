//! `SqliteKv`: backend durable del `KvStore` del gate.
//!
//! Las claves vencidas se ignoran al leer (igual que en memoria) y se borran
//! con `purge_expired`. El contador de cuota corre en `BEGIN IMMEDIATE`.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use diesel::expression_methods::EscapeExpressionMethods;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use f0_gate::{GateError, KvStore};
use log::debug;

use super::{with_retry, ConnectionProvider, PoolProvider, SqlitePool};
use crate::error::PersistenceError;
use crate::schema::kv_entries;

type KvTx<T> = Result<Result<T, GateError>, DieselError>;

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = kv_entries)]
struct KvRow {
    key: String,
    value: String,
    expires_at: Option<NaiveDateTime>,
}

impl KvRow {
    fn is_live(&self, now: NaiveDateTime) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Patrón LIKE que matchea `prefix` literal (escape `\`).
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct SqliteKv<P: ConnectionProvider = PoolProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> SqliteKv<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn read<T, F>(&self, mut f: F) -> Result<T, GateError>
        where F: FnMut(&mut SqliteConnection) -> QueryResult<T>
    {
        Ok(with_retry(|| {
            let mut conn = self.provider.connection()?;
            f(&mut *conn).map_err(PersistenceError::from)
        })?)
    }

    fn write<T, F>(&self, mut f: F) -> Result<T, GateError>
        where F: FnMut(&mut SqliteConnection) -> KvTx<T>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.immediate_transaction(|tx| f(tx)).map_err(PersistenceError::from)
        })?
    }
}

impl SqliteKv<PoolProvider> {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

impl<P: ConnectionProvider> KvStore for SqliteKv<P> {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, GateError> {
        let now = now.naive_utc();
        self.read(|conn| {
                kv_entries::table.find(key)
                                 .filter(kv_entries::expires_at.is_null().or(kv_entries::expires_at.gt(now)))
                                 .select(kv_entries::value)
                                 .first::<String>(conn)
                                 .optional()
            })
    }

    fn put(&self, key: &str, value: String, ttl: Option<Duration>, now: DateTime<Utc>) -> Result<(), GateError> {
        let row = KvRow { key: key.to_string(),
                          value,
                          expires_at: ttl.map(|t| (now + t).naive_utc()) };
        self.read(|conn| diesel::replace_into(kv_entries::table).values(&row).execute(conn))?;
        Ok(())
    }

    fn increment_below(&self, key: &str, limit: u32, ttl: Duration, now: DateTime<Utc>)
                       -> Result<Option<u32>, GateError> {
        let naive_now = now.naive_utc();
        self.write(|tx| {
                let current = kv_entries::table.find(key)
                                               .select(KvRow::as_select())
                                               .first(tx)
                                               .optional()?
                                               .filter(|row| row.is_live(naive_now));
                match current {
                    Some(row) => {
                        let Ok(used) = row.value.parse::<u32>() else {
                            return Ok(Err(GateError::Store(format!("counter {key} is not numeric"))));
                        };
                        if used >= limit {
                            return Ok(Ok(None));
                        }
                        diesel::update(kv_entries::table.find(key)).set(kv_entries::value.eq((used + 1).to_string()))
                                                                   .execute(tx)?;
                        Ok(Ok(Some(used + 1)))
                    }
                    None if limit == 0 => Ok(Ok(None)),
                    // Ausente o vencido: el contador arranca de nuevo con TTL fresco.
                    None => {
                        let row = KvRow { key: key.to_string(),
                                          value: "1".into(),
                                          expires_at: Some((now + ttl).naive_utc()) };
                        diesel::replace_into(kv_entries::table).values(&row).execute(tx)?;
                        Ok(Ok(Some(1)))
                    }
                }
            })
    }

    fn keys_with_prefix(&self, prefix: &str, now: DateTime<Utc>) -> Result<Vec<String>, GateError> {
        let now = now.naive_utc();
        let pattern = like_prefix(prefix);
        let keys = self.read(|conn| {
                           kv_entries::table.filter(kv_entries::key.like(pattern.as_str()).escape('\\'))
                                            .filter(kv_entries::expires_at.is_null()
                                                                          .or(kv_entries::expires_at.gt(now)))
                                            .select(kv_entries::key)
                                            .load::<String>(conn)
                       })?;
        // LIKE de SQLite ignora mayúsculas ASCII.
        Ok(keys.into_iter().filter(|k| k.starts_with(prefix)).collect())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, GateError> {
        let now = now.naive_utc();
        let purged =
            self.read(|conn| diesel::delete(kv_entries::table.filter(kv_entries::expires_at.le(now))).execute(conn))?;
        debug!("kv:purge removed={purged}");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_prefix("form:a_b:"), "form:a\\_b:%");
        assert_eq!(like_prefix("100%"), "100\\%%");
    }
}
