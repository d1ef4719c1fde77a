//! Core events emitted by the engine

use chrono::{DateTime, Utc};
use quota_api::SessionEndReason;
use quota_util::{SessionId, YearMonth};
use std::time::Duration;

/// Buffered events per subscriber before the slowest one starts lagging
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notifications from the engine
///
/// Every variant means presented state may have changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A new month began and the record was reset
    MonthRolledOver { from: YearMonth, to: YearMonth },

    /// Session started successfully
    SessionStarted {
        session_id: SessionId,
        started_at: DateTime<Utc>,
        remaining_sessions: u32,
    },

    /// Session was stopped or expired
    SessionEnded {
        session_id: SessionId,
        reason: SessionEndReason,
        duration: Duration,
    },

    /// Emitted after every tick and after message updates
    StateChanged,
}
