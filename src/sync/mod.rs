pub mod clockify;
pub mod monday;

use serde::Serialize;

/// Default look-back window for the time-tracking sync, in days.
pub const DEFAULT_DAYS_BACK: i64 = 7;

/// Options controlling a time-tracking sync.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub days_back: i64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            days_back: DEFAULT_DAYS_BACK,
        }
    }
}

/// Running statistics for a time-tracking sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClockifyStats {
    /// Zero-duration entries skipped.
    pub no_hours: u64,
    /// Entries attributed to a first sprint as preparation work.
    pub pre_sprint_prep: u64,
    /// Entries with a client but no resolvable sprint window.
    pub no_sprint: u64,
    /// Entries with no resolvable client.
    pub non_client_work: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClockifyReport {
    pub entries_synced: u64,
    pub entries_skipped: u64,
    pub stats: ClockifyStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MondayReport {
    pub clients_synced: u64,
    pub sprints_synced: u64,
}

/// Progress callbacks for long-running syncs. The CLI wires these to
/// stderr; everything else uses [`NoopProgress`].
pub trait SyncProgress {
    fn on_user_start(&self, _name: &str) {}
    fn on_entries_fetched(&self, _name: &str, _count: usize) {}
    fn on_board_start(&self, _region: &str, _board_name: &str) {}
    fn on_group_start(&self, _title: &str, _items: usize) {}
}

pub struct NoopProgress;

impl SyncProgress for NoopProgress {}
