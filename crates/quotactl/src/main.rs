//! quotactl - command-line host for the session quota tracker
//!
//! Wires configuration, logging, the JSON store and the quota service
//! together and exposes them as subcommands.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use quota_api::{SessionEndReason, UsageSnapshot};
use quota_config::{load_config_or_default, TrackerConfig};
use quota_core::{EngineEvent, QuotaEngine, QuotaService, TickOutcome};
use quota_store::JsonFileStore;
use quota_util::{default_config_path, format_countdown, SystemClock};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// quotactl - Track usage sessions against a monthly quota
#[derive(Parser, Debug)]
#[command(name = "quotactl")]
#[command(about = "Track usage sessions against a monthly quota", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/quota-tracker/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set QUOTA_DATA_DIR env var)
    #[arg(short, long, env = "QUOTA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show this month's usage and the active session
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a new session
    Start,
    /// Stop the active session
    Stop,
    /// Count a message against the active session
    Message,
    /// Follow the active session until it ends
    Watch,
}

fn resolve_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(data_dir) = &args.data_dir {
        config.tracker.data_dir = data_dir.clone();
    }

    Ok(config)
}

fn open_store(config: &TrackerConfig) -> JsonFileStore {
    let store = JsonFileStore::in_dir(&config.tracker.data_dir);
    if config.tracker.archive_on_rollover {
        store.with_archive(config.tracker.archive_dir())
    } else {
        store
    }
}

async fn open_service(config: &TrackerConfig) -> QuotaService {
    let store = Arc::new(open_store(config));
    info!(
        path = %store.path().display(),
        monthly_quota = config.policy.monthly_quota,
        "Store opened"
    );

    let engine = QuotaEngine::new(config.policy, Arc::new(SystemClock), store);
    QuotaService::new(engine, config.tracker.tick_interval).await
}

/// Deliver the tick owed since the last invocation, so a session that ran
/// past its limit while nothing was ticking expires before the command acts.
async fn catch_up(service: &QuotaService) -> TickOutcome {
    let outcome = service.tick_now().await;
    if let TickOutcome::Expired(result) = &outcome {
        eprintln!(
            "Session {} expired after {}",
            result.session_id,
            format_countdown(result.duration)
        );
    }
    outcome
}

fn render_status(snapshot: &UsageSnapshot) -> String {
    let mut out = format!(
        "{}: {}/{} sessions used, {} remaining\n",
        snapshot.year_month,
        snapshot.used_sessions,
        snapshot.monthly_quota,
        snapshot.remaining_sessions
    );

    match &snapshot.active {
        Some(active) => {
            out.push_str(&format!(
                "Active session {} since {}\n",
                active.session_id,
                active.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ));
            out.push_str(&format!(
                "  elapsed {}, {} left ({:.0}%), {}/{} messages\n",
                format_countdown(active.elapsed),
                format_countdown(active.remaining),
                active.progress * 100.0,
                active.message_count,
                snapshot.message_limit
            ));
        }
        None => out.push_str("No active session\n"),
    }

    out
}

fn render_event(event: &EngineEvent, snapshot: &UsageSnapshot) -> Option<String> {
    match event {
        EngineEvent::MonthRolledOver { from, to } => {
            Some(format!("New month {} (was {})", to, from))
        }
        EngineEvent::SessionStarted {
            remaining_sessions, ..
        } => Some(format!(
            "Session started, {} remaining this month",
            remaining_sessions
        )),
        EngineEvent::SessionEnded {
            reason, duration, ..
        } => {
            let verb = match reason {
                SessionEndReason::Stopped => "stopped",
                SessionEndReason::Expired => "expired",
            };
            Some(format!(
                "Session {} after {}",
                verb,
                format_countdown(*duration)
            ))
        }
        EngineEvent::StateChanged => snapshot
            .active
            .as_ref()
            .map(|a| format!("{} remaining", format_countdown(a.remaining))),
    }
}

async fn watch(service: &QuotaService) -> Result<()> {
    let mut events = service.subscribe();

    let snapshot = service.snapshot().await;
    print!("{}", render_status(&snapshot));
    if snapshot.active.is_none() {
        return Ok(());
    }

    loop {
        tokio::select! {
            received = events.recv() => {
                let event = match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Watcher lagged behind");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let snapshot = service.snapshot().await;
                if let Some(line) = render_event(&event, &snapshot) {
                    println!("{}", line);
                }
                if matches!(event, EngineEvent::SessionEnded { .. }) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, session left running");
                break;
            }
        }
    }

    Ok(())
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = resolve_config(&args)?;
    let service = open_service(&config).await;
    catch_up(&service).await;

    let outcome = match args.command {
        Command::Status { json } => {
            let snapshot = service.snapshot().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", render_status(&snapshot));
            }
            Ok(())
        }
        Command::Start => service.start_session().await.map(|id| {
            println!("Started session {}", id);
        }),
        Command::Stop => service.stop_session().await.map(|result| {
            println!(
                "Stopped session {} after {}",
                result.session_id,
                format_countdown(result.duration)
            );
        }),
        Command::Message => service.record_message().await.map(|count| {
            println!("{} messages in this session", count);
        }),
        Command::Watch => {
            watch(&service).await?;
            Ok(())
        }
    };

    service.shutdown().await;

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), "quotactl starting");

    run(args).await
}
