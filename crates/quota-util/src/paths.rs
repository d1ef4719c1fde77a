//! Default paths for the quota tracker
//!
//! Paths are user-writable by default:
//! - Data: `$XDG_DATA_HOME/quota-tracker` or `~/.local/share/quota-tracker`
//! - Config: `$XDG_CONFIG_HOME/quota-tracker/config.toml` or `~/.config/quota-tracker/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const QUOTA_DATA_DIR_ENV: &str = "QUOTA_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "quota-tracker";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Stats filename within the data directory
pub const STATS_FILENAME: &str = "stats.json";

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$QUOTA_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/quota-tracker` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/quota-tracker` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(QUOTA_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the QUOTA_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/quota-tracker/config.toml`
/// 2. `~/.config/quota-tracker/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home)
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Location of the stats record inside a data directory
pub fn stats_path(data_dir: impl Into<PathBuf>) -> PathBuf {
    data_dir.into().join(STATS_FILENAME)
}
