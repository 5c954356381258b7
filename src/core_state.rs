//! Shared application state for HTTP handlers, the scheduler and
//! background analysis.
//!
//! Holds configuration and collaborators only. Every request or task opens
//! its own connection through [`CoreState::open_db`]. The schema is
//! migrated by the first successful open only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::AppConfig;
use crate::db::{self, DatabaseError};
use crate::intelligence::{AdherenceProvider, HealthAnalysisEngine, SqliteAdherenceProvider};

pub struct CoreState {
    pub config: AppConfig,
    adherence: Arc<dyn AdherenceProvider>,
    started_at: Instant,
    schema_ready: AtomicBool,
    migration_lock: Mutex<()>,
}

impl CoreState {
    /// State backed by the local medication tables.
    pub fn new(config: AppConfig) -> Self {
        Self::with_adherence_provider(config, Arc::new(SqliteAdherenceProvider))
    }

    pub fn with_adherence_provider(config: AppConfig, adherence: Arc<dyn AdherenceProvider>) -> Self {
        Self {
            config,
            adherence,
            started_at: Instant::now(),
            schema_ready: AtomicBool::new(false),
            migration_lock: Mutex::new(()),
        }
    }

    /// Open a connection to the configured database. Migrations run on the
    /// first call; later calls only connect and set pragmas.
    pub fn open_db(&self) -> Result<rusqlite::Connection, DatabaseError> {
        let conn = db::connect_database(&self.config.db_path)?;
        if !self.schema_ready.load(Ordering::Acquire) {
            let _guard = self
                .migration_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !self.schema_ready.load(Ordering::Acquire) {
                db::run_migrations(&conn)?;
                self.schema_ready.store(true, Ordering::Release);
            }
        }
        Ok(conn)
    }

    /// Build an analysis engine for one run.
    pub fn engine(&self) -> HealthAnalysisEngine {
        HealthAnalysisEngine::new(self.config.analysis.clone(), self.adherence.clone())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
