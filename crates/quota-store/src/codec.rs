//! JSON codec for the stats record
//!
//! Wire layout:
//!
//! ```json
//! {
//!   "yearMonth": {"year": 2025, "month": 6},
//!   "sessions": [
//!     {"id": "<uuid>", "start": "2025-06-15T12:00:00Z", "end": null, "messageCount": 0}
//!   ]
//! }
//! ```

use chrono::{DateTime, Utc};
use quota_api::{MonthlyStats, Session};
use quota_util::{SessionId, YearMonth};
use serde::{Deserialize, Serialize};

use crate::StoreResult;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsRecord {
    year_month: YearMonth,
    sessions: Vec<SessionRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    id: SessionId,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    message_count: u32,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id(),
            start: session.start(),
            end: session.end(),
            message_count: session.message_count(),
        }
    }
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Session::restore(record.id, record.start, record.end, record.message_count)
    }
}

/// Serialize a stats record to its JSON form
pub fn encode_stats(stats: &MonthlyStats) -> StoreResult<String> {
    let record = StatsRecord {
        year_month: stats.year_month(),
        sessions: stats.sessions().iter().map(SessionRecord::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&record)?)
}

/// Parse and validate a stats record
pub fn decode_stats(json: &str) -> StoreResult<MonthlyStats> {
    let record: StatsRecord = serde_json::from_str(json)?;
    let sessions = record.sessions.into_iter().map(Session::from).collect();
    Ok(MonthlyStats::from_sessions(record.year_month, sessions)?)
}
