//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Storage and scheduling settings
    #[serde(default)]
    pub tracker: RawTrackerConfig,

    /// Quota limits
    #[serde(default)]
    pub limits: RawLimits,
}

/// Tracker-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawTrackerConfig {
    /// Directory holding `stats.json`
    pub data_dir: Option<PathBuf>,

    /// Period of the expiry tick, in milliseconds
    pub tick_interval_ms: Option<u64>,

    /// Keep the previous month's record when a new month starts
    pub archive_on_rollover: Option<bool>,
}

/// Quota limits
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawLimits {
    /// Sessions allowed per calendar month
    pub monthly_quota: Option<u32>,

    /// Maximum length of one session, in seconds
    pub session_limit_seconds: Option<u64>,

    /// Per-session message budget shown alongside the count
    pub message_limit: Option<u32>,
}
