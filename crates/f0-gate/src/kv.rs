//! Almacén clave-valor con expiración opcional por clave.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::GateError;

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, GateError>;
    fn put(&self, key: &str, value: String, ttl: Option<Duration>, now: DateTime<Utc>) -> Result<(), GateError>;

    /// Incrementa el contador `key` si su valor actual es menor que `limit`.
    ///
    /// Devuelve el valor nuevo, o `None` si el contador ya alcanzó el límite.
    /// Comprobación e incremento son una sola operación atómica. El TTL se
    /// fija al crear el contador y no se renueva.
    fn increment_below(&self, key: &str, limit: u32, ttl: Duration, now: DateTime<Utc>)
                       -> Result<Option<u32>, GateError>;

    /// Claves vigentes con el prefijo dado (orden no especificado).
    fn keys_with_prefix(&self, prefix: &str, now: DateTime<Utc>) -> Result<Vec<String>, GateError>;

    /// Descarta las claves vencidas a `now`; devuelve cuántas se borraron.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, GateError>;
}

impl<K: KvStore + ?Sized> KvStore for Arc<K> {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, GateError> {
        (**self).get(key, now)
    }
    fn put(&self, key: &str, value: String, ttl: Option<Duration>, now: DateTime<Utc>) -> Result<(), GateError> {
        (**self).put(key, value, ttl, now)
    }
    fn increment_below(&self, key: &str, limit: u32, ttl: Duration, now: DateTime<Utc>)
                       -> Result<Option<u32>, GateError> {
        (**self).increment_below(key, limit, ttl, now)
    }
    fn keys_with_prefix(&self, prefix: &str, now: DateTime<Utc>) -> Result<Vec<String>, GateError> {
        (**self).keys_with_prefix(prefix, now)
    }
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, GateError> {
        (**self).purge_expired(now)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Slot {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Backend en memoria; las claves vencidas se ignoran al leer y se
/// descartan con `purge_expired`.
#[derive(Debug, Default)]
pub struct InMemoryKv {
    slots: DashMap<String, Slot>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl KvStore for InMemoryKv {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, GateError> {
        Ok(self.slots
               .get(key)
               .filter(|slot| slot.is_live(now))
               .map(|slot| slot.value.clone()))
    }

    fn put(&self, key: &str, value: String, ttl: Option<Duration>, now: DateTime<Utc>) -> Result<(), GateError> {
        self.slots.insert(key.to_string(),
                          Slot { value,
                                 expires_at: ttl.map(|t| now + t) });
        Ok(())
    }

    fn increment_below(&self, key: &str, limit: u32, ttl: Duration, now: DateTime<Utc>)
                       -> Result<Option<u32>, GateError> {
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_live(now) => {
                let current: u32 = occupied.get()
                                           .value
                                           .parse()
                                           .map_err(|_| GateError::Store(format!("counter {key} is not numeric")))?;
                if current >= limit {
                    return Ok(None);
                }
                occupied.get_mut().value = (current + 1).to_string();
                Ok(Some(current + 1))
            }
            Entry::Occupied(mut expired) => {
                expired.insert(Slot { value: "1".into(),
                                      expires_at: Some(now + ttl) });
                Ok((limit > 0).then_some(1))
            }
            Entry::Vacant(vacant) => {
                if limit == 0 {
                    return Ok(None);
                }
                vacant.insert(Slot { value: "1".into(),
                                     expires_at: Some(now + ttl) });
                Ok(Some(1))
            }
        }
    }

    fn keys_with_prefix(&self, prefix: &str, now: DateTime<Utc>) -> Result<Vec<String>, GateError> {
        Ok(self.slots
               .iter()
               .filter(|slot| slot.key().starts_with(prefix) && slot.value().is_live(now))
               .map(|slot| slot.key().clone())
               .collect())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, GateError> {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.is_live(now));
        Ok(before.saturating_sub(self.slots.len()))
    }
}
