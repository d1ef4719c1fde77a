//! Time utilities for the quota tracker
//!
//! Everything time-sensitive goes through the [`Clock`] trait so the engine
//! can be driven by a [`MockClock`] in tests. Calendar months are bucketed
//! with [`YearMonth`], derived from an instant using the local calendar.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `QUOTA_MOCK_TIME` environment variable can be set
//! to shift [`SystemClock`] to a different wall-clock time. The shifted clock
//! still advances at real-time rate. Useful for checking month rollover by hand.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-31 23:59:00`)
//!
//! ```bash
//! QUOTA_MOCK_TIME="2025-12-31 23:59:00" quotactl status
//! ```

use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "QUOTA_MOCK_TIME";

/// Expected format of [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached offset between mock time and real time at process start.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                return parse_mock_offset(&mock_time_str, Utc::now());
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Compute the offset that shifts `real_now` onto the local time in `mock_time_str`.
#[cfg_attr(not(debug_assertions), allow(dead_code))]
fn parse_mock_offset(mock_time_str: &str, real_now: DateTime<Utc>) -> Option<chrono::Duration> {
    let Ok(naive_dt) = NaiveDateTime::parse_from_str(mock_time_str, MOCK_TIME_FORMAT) else {
        tracing::warn!(
            mock_time = %mock_time_str,
            expected_format = MOCK_TIME_FORMAT,
            "Invalid mock time format"
        );
        return None;
    };

    let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() else {
        tracing::warn!(
            mock_time = %mock_time_str,
            "Failed to convert mock time to local timezone"
        );
        return None;
    };

    let offset = mock_dt.with_timezone(&Utc).signed_duration_since(real_now);
    tracing::info!(
        mock_time = %mock_time_str,
        offset_secs = offset.num_seconds(),
        "Mock time enabled"
    );
    Some(offset)
}

/// Source of the current instant.
///
/// The engine never reads time from anywhere else.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, shifted by `QUOTA_MOCK_TIME` in debug builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let real_now = Utc::now();
        match get_mock_time_offset() {
            Some(offset) => real_now + offset,
            None => real_now,
        }
    }
}

/// Manually driven clock for tests and simulations.
///
/// Time only moves when [`MockClock::advance`] or [`MockClock::set`] is called.
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward. Durations that would overflow are ignored.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
        {
            *now = next;
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A calendar month bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Used when the calendar cannot resolve an instant. Not a normal path.
    pub const FALLBACK: YearMonth = YearMonth {
        year: 2025,
        month: 1,
    };

    /// Returns `None` unless `month` is 1-12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Bucket an instant by the local calendar's year and month.
    pub fn from_instant(instant: &DateTime<Utc>) -> Self {
        let local = instant.with_timezone(&Local);
        Self::new(local.year(), local.month()).unwrap_or_else(|| {
            tracing::warn!(instant = %instant, "Calendar resolution failed, using fallback month");
            Self::FALLBACK
        })
    }

    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Elapsed time between two instants, clamped at zero.
pub fn duration_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    end.signed_duration_since(start)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a duration as a countdown, `H:MM:SS`.
pub fn format_countdown(d: Duration) -> String {
    let total_secs = d.as_secs();
    format!(
        "{}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}
