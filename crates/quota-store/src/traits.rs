//! Store trait definitions

use quota_api::MonthlyStats;

use crate::StoreResult;

/// Durable home of the single monthly stats record
pub trait Store: Send + Sync {
    /// Load the saved record. `Ok(None)` when nothing has been saved yet.
    fn load_stats(&self) -> StoreResult<Option<MonthlyStats>>;

    /// Replace the saved record with `stats`
    fn save_stats(&self, stats: &MonthlyStats) -> StoreResult<()>;
}
