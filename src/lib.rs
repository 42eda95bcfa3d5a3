pub mod clockify;
pub mod config;
pub mod date_util;
pub mod error;
pub mod monday;
pub mod resolve;
pub mod serve;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
pub use storage::Database;
pub use sync::{
    ClockifyReport, ClockifyStats, MondayReport, NoopProgress, SyncOptions, SyncProgress,
    DEFAULT_DAYS_BACK,
};

use chrono::Utc;

use clockify::ClockifyClient;
use monday::MondayClient;
use storage::repository;

/// Main entry point for the agency reporting warehouse.
pub struct AgencyDW {
    db: Database,
    config: Config,
}

impl AgencyDW {
    pub fn new(db: Database, config: Config) -> Self {
        Self { db, config }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Run the time-tracking sync over the configured look-back window.
    ///
    /// Missing configuration aborts before any I/O. Any other top-level
    /// failure is recorded in `sync_logs` with status `error` before the
    /// error propagates, so the audit trail covers failed runs too.
    pub async fn sync_clockify(
        &self,
        options: &SyncOptions,
        progress: &dyn SyncProgress,
    ) -> Result<ClockifyReport> {
        let (api_key, workspace_id) = self.config.clockify()?;
        let client = ClockifyClient::new(api_key, workspace_id);

        let started = Utc::now();
        match sync::clockify::sync_clockify(&self.db, &client, options, progress).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.record_failure("clockify", &started.to_rfc3339(), &e).await;
                Err(e)
            }
        }
    }

    /// Run the project-management board sync across all configured
    /// region boards.
    pub async fn sync_monday(&self, progress: &dyn SyncProgress) -> Result<MondayReport> {
        let api_key = self.config.monday_key()?;
        let client = MondayClient::new(api_key);
        let boards = self.config.monday_boards();

        let started = Utc::now();
        match sync::monday::sync_monday(&self.db, &client, &boards, progress).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.record_failure("monday", &started.to_rfc3339(), &e).await;
                Err(e)
            }
        }
    }

    /// Best-effort failure audit row. A write failure here is only
    /// logged: the original sync error is the one worth surfacing.
    async fn record_failure(&self, source: &'static str, started: &str, error: &Error) {
        let started = started.to_string();
        let message = error.to_string();
        let result = self
            .db
            .writer()
            .call(move |conn| {
                repository::insert_sync_log(
                    conn,
                    source,
                    &started,
                    &Utc::now().to_rfc3339(),
                    "error",
                    0,
                    Some(&message),
                )
            })
            .await;
        if let Err(e) = result {
            log::warn!("Failed to log sync failure for {source}: {e}");
        }
    }
}
