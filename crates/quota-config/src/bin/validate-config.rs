//! Config validation CLI tool
//!
//! Validates a quota tracker configuration file and reports any errors.

use quota_config::ConfigError;
use quota_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a quota tracker configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match quota_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", quota_config::CURRENT_CONFIG_VERSION);
            println!("  Data directory: {}", config.tracker.data_dir.display());
            println!("  Monthly quota: {} sessions", config.policy.monthly_quota);
            println!(
                "  Session limit: {}",
                format_duration(config.policy.session_limit)
            );
            println!("  Message limit: {} per session", config.policy.message_limit);
            println!("  Tick interval: {:?}", config.tracker.tick_interval);
            println!(
                "  Archive on rollover: {}",
                if config.tracker.archive_on_rollover { "yes" } else { "no" }
            );
            ExitCode::SUCCESS
        }
        Err(ConfigError::ValidationFailed { errors }) => {
            eprintln!("✗ Configuration has {} error(s):", errors.len());
            for error in errors {
                eprintln!("  - {}", error);
            }
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {}", e);
            ExitCode::from(1)
        }
    }
}
