//! Estado compartido de la aplicación.

use std::sync::Arc;

use chrono::Utc;
use f0_core::{InMemoryLedgerStore, LedgerError, LedgerStore, ReferralEngine};
use f0_gate::{Gate, GateError, InMemoryKv, KvStore};
use f0_persistence::{build_pool, PersistenceError, SqliteKv, SqliteLedgerStore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, StoreKind};
use crate::error::{AppError, AppResult};

pub type DynStore = Arc<dyn LedgerStore>;
pub type DynKv = Arc<dyn KvStore>;
pub type Engine = ReferralEngine<DynStore>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub gate: Arc<Gate<DynKv>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Construye los stores indicados por la configuración (migrando SQLite).
    /// Con SQLite, ledger y gate comparten el pool.
    pub fn new(config: AppConfig) -> Result<Self, PersistenceError> {
        let (store, kv): (DynStore, DynKv) = match config.store {
            StoreKind::Sqlite => {
                info!("Opening SQLite ledger at {}", config.database.url);
                let pool = build_pool(&config.database)?;
                (Arc::new(SqliteLedgerStore::from_pool(pool.clone())), Arc::new(SqliteKv::from_pool(pool)))
            }
            StoreKind::Memory => {
                info!("Using in-memory ledger");
                (Arc::new(InMemoryLedgerStore::new()), Arc::new(InMemoryKv::new()))
            }
        };
        Ok(Self::with_stores(config, store, kv))
    }

    /// Ledger provisto por el caller; el gate queda en memoria.
    pub fn with_store(config: AppConfig, store: DynStore) -> Self {
        Self::with_stores(config, store, Arc::new(InMemoryKv::new()))
    }

    pub fn with_stores(config: AppConfig, store: DynStore, kv: DynKv) -> Self {
        let mut engine = ReferralEngine::new(store);
        if let Some(secret) = config.license_secret.as_deref() {
            engine = engine.with_license_secret(secret);
        }
        Self { engine: Arc::new(engine),
               gate: Arc::new(Gate::new(kv)),
               config: Arc::new(config) }
    }

    /// Corre una operación del ledger fuera del runtime async: los stores
    /// hacen IO bloqueante y toman locks.
    pub async fn run<T, F>(&self, f: F) -> AppResult<T>
        where F: FnOnce(&Engine) -> Result<T, LedgerError> + Send + 'static,
              T: Send + 'static
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || f(&engine)).await
                                                        .map_err(|e| AppError::Internal(format!("ledger task: {e}")))?
                                                        .map_err(AppError::from)
    }

    /// Igual que `run`, para el gate.
    pub async fn run_gate<T, F>(&self, f: F) -> AppResult<T>
        where F: FnOnce(&Gate<DynKv>) -> Result<T, GateError> + Send + 'static,
              T: Send + 'static
    {
        let gate = Arc::clone(&self.gate);
        tokio::task::spawn_blocking(move || f(&gate)).await
                                                      .map_err(|e| AppError::Internal(format!("gate task: {e}")))?
                                                      .map_err(AppError::from)
    }

    /// Tarea periódica que borra las claves vencidas del gate. Un fallo se
    /// loguea y se reintenta en el siguiente tick.
    pub fn spawn_gate_purge(&self) -> JoinHandle<()> {
        let state = self.clone();
        let period = self.config.purge_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match state.run_gate(|gate| gate.purge_expired(Utc::now())).await {
                    Ok(purged) => debug!(purged, "gate purge"),
                    Err(e) => warn!("gate purge failed: {e}"),
                }
            }
        })
    }
}
