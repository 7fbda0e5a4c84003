#![allow(dead_code)]

use f0_core::ReferralEngine;
use f0_persistence::{build_pool, DbConfig, SqliteLedgerStore, SqlitePool};

/// Base SQLite nueva en un archivo temporal propio del test.
pub struct TempDb {
    pub path: std::path::PathBuf,
    pub pool: SqlitePool,
}

impl TempDb {
    pub fn new(max_connections: u32) -> Self {
        let path = std::env::temp_dir().join(format!("f0-test-{}.db", uuid::Uuid::new_v4()));
        let cfg = DbConfig { max_connections,
                             ..DbConfig::for_path(path.to_string_lossy().to_string()) };
        let pool = build_pool(&cfg).expect("pool");
        Self { path, pool }
    }

    pub fn engine(&self) -> ReferralEngine<SqliteLedgerStore> {
        ReferralEngine::new(SqliteLedgerStore::from_pool(self.pool.clone()))
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}
