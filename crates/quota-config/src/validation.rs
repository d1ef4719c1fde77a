//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Smallest accepted tick period
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Largest accepted tick period
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("limits.{field}: {message}")]
    LimitError { field: &'static str, message: String },

    #[error("tracker.{field}: {message}")]
    TrackerError { field: &'static str, message: String },
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.limits.monthly_quota == Some(0) {
        errors.push(ValidationError::LimitError {
            field: "monthly_quota",
            message: "must be at least 1".into(),
        });
    }

    if config.limits.session_limit_seconds == Some(0) {
        errors.push(ValidationError::LimitError {
            field: "session_limit_seconds",
            message: "must be at least 1".into(),
        });
    }

    if config.limits.message_limit == Some(0) {
        errors.push(ValidationError::LimitError {
            field: "message_limit",
            message: "must be at least 1".into(),
        });
    }

    if let Some(tick_ms) = config.tracker.tick_interval_ms {
        if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&tick_ms) {
            errors.push(ValidationError::TrackerError {
                field: "tick_interval_ms",
                message: format!(
                    "must be between {} and {}",
                    MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS
                ),
            });
        }

        if let Some(limit_secs) = config.limits.session_limit_seconds
            && limit_secs > 0
            && tick_ms > limit_secs.saturating_mul(1000)
        {
            errors.push(ValidationError::TrackerError {
                field: "tick_interval_ms",
                message: format!("longer than the {}s session limit", limit_secs),
            });
        }
    }

    if let Some(dir) = &config.tracker.data_dir
        && dir.as_os_str().is_empty()
    {
        errors.push(ValidationError::TrackerError {
            field: "data_dir",
            message: "cannot be empty".into(),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> RawConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&parse("config_version = 1")).is_empty());
    }

    #[test]
    fn zero_limits_rejected() {
        let config = parse(
            r#"
            config_version = 1
            [limits]
            monthly_quota = 0
            session_limit_seconds = 0
            message_limit = 0
        "#,
        );

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::LimitError { .. })));
    }

    #[test]
    fn tick_interval_bounds() {
        let config = parse(
            r#"
            config_version = 1
            [tracker]
            tick_interval_ms = 5
        "#,
        );
        assert!(matches!(
            validate_config(&config).as_slice(),
            [ValidationError::TrackerError { field: "tick_interval_ms", .. }]
        ));
    }

    #[test]
    fn tick_longer_than_session_rejected() {
        let config = parse(
            r#"
            config_version = 1
            [tracker]
            tick_interval_ms = 30000
            [limits]
            session_limit_seconds = 10
        "#,
        );

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("10s session limit"));
    }

    #[test]
    fn empty_data_dir_rejected() {
        let config = parse(
            r#"
            config_version = 1
            [tracker]
            data_dir = ""
        "#,
        );
        assert_eq!(validate_config(&config).len(), 1);
    }
}
