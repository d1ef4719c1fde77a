//! Validated configuration structures

use crate::schema::RawConfig;
use quota_api::{QuotaPolicy, DEFAULT_MESSAGE_LIMIT, DEFAULT_MONTHLY_QUOTA, DEFAULT_SESSION_LIMIT};
use quota_util::default_data_dir;
use std::path::PathBuf;
use std::time::Duration;

/// Default tick period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Validated configuration ready for the engine and host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerConfig {
    pub tracker: TrackerSettings,
    pub policy: QuotaPolicy,
}

/// Storage and scheduling settings
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
    pub archive_on_rollover: bool,
}

impl TrackerSettings {
    /// Where rolled-over months are kept when archiving is enabled
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("archive")
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            archive_on_rollover: false,
        }
    }
}

impl TrackerConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let tracker = TrackerSettings {
            data_dir: raw.tracker.data_dir.unwrap_or_else(default_data_dir),
            tick_interval: raw
                .tracker
                .tick_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TICK_INTERVAL),
            archive_on_rollover: raw.tracker.archive_on_rollover.unwrap_or(false),
        };

        let policy = QuotaPolicy {
            monthly_quota: raw.limits.monthly_quota.unwrap_or(DEFAULT_MONTHLY_QUOTA),
            session_limit: raw
                .limits
                .session_limit_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SESSION_LIMIT),
            message_limit: raw.limits.message_limit.unwrap_or(DEFAULT_MESSAGE_LIMIT),
        };

        Self { tracker, policy }
    }
}
