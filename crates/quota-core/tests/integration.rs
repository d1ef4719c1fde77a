//! Integration tests for the quota engine
//!
//! These exercise the engine against a real on-disk store, including
//! restarts and month rollover.

use chrono::{DateTime, TimeZone, Utc};
use quota_api::{QuotaPolicy, SessionEndReason, DEFAULT_SESSION_LIMIT};
use quota_core::{EngineEvent, QuotaEngine, QuotaService, TickOutcome};
use quota_store::{decode_stats, JsonFileStore, Store};
use quota_util::{MockClock, QuotaError, YearMonth};
use std::sync::Arc;
use std::time::Duration;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn engine_at(clock: &Arc<MockClock>, store: &Arc<JsonFileStore>) -> QuotaEngine {
    QuotaEngine::new(QuotaPolicy::default(), clock.clone(), store.clone())
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::in_dir(dir.path()));
    let clock = Arc::new(MockClock::new(t0()));

    let active_id = {
        let mut engine = engine_at(&clock, &store);
        for _ in 0..3 {
            engine.start_session().unwrap();
            clock.advance(Duration::from_secs(60));
            engine.stop_session().unwrap();
        }
        let id = engine.start_session().unwrap();
        engine.record_message().unwrap();
        id
    };

    clock.advance(Duration::from_secs(300));
    let mut engine = engine_at(&clock, &store);

    assert_eq!(engine.used_sessions(), 4);
    assert_eq!(engine.remaining_sessions(), 46);
    let active = engine.active_session().unwrap();
    assert_eq!(active.id(), active_id);
    assert_eq!(active.message_count(), 1);
    assert!(engine.is_ticking());

    let result = engine.stop_session().unwrap();
    assert_eq!(result.duration, Duration::from_secs(300));
}

#[test]
fn test_monthly_rollover_with_new_engine() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::in_dir(dir.path()));
    let clock = Arc::new(MockClock::new(t0()));

    {
        let mut engine = engine_at(&clock, &store);
        for _ in 0..50 {
            engine.start_session().unwrap();
            engine.stop_session().unwrap();
        }
        assert_eq!(engine.used_sessions(), 50);
        assert_eq!(engine.remaining_sessions(), 0);
        assert_eq!(
            engine.start_session().unwrap_err(),
            QuotaError::QuotaReached { quota: 50 }
        );
    }

    clock.advance(Duration::from_secs(32 * 24 * 60 * 60));
    let mut engine = engine_at(&clock, &store);
    assert_eq!(engine.used_sessions(), 0);

    engine.start_session().unwrap();
    assert_eq!(engine.used_sessions(), 1);
    assert_eq!(engine.remaining_sessions(), 49);

    // Baseline: the old month is overwritten
    let saved = store.load_stats().unwrap().unwrap();
    assert_eq!(saved.year_month(), YearMonth::new(2025, 7).unwrap());
    assert_eq!(saved.used_sessions(), 1);
}

#[test]
fn test_rollover_archives_previous_month_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::in_dir(dir.path()).with_archive(dir.path().join("archive")));
    let clock = Arc::new(MockClock::new(t0()));

    let mut engine = engine_at(&clock, &store);
    for _ in 0..5 {
        engine.start_session().unwrap();
        engine.stop_session().unwrap();
    }

    clock.advance(Duration::from_secs(32 * 24 * 60 * 60));
    engine.start_session().unwrap();

    let archive = store
        .archive_path(YearMonth::new(2025, 6).unwrap())
        .unwrap();
    let archived = decode_stats(&std::fs::read_to_string(archive).unwrap()).unwrap();
    assert_eq!(archived.used_sessions(), 5);
    assert_eq!(store.load_stats().unwrap().unwrap().used_sessions(), 1);
}

#[test]
fn test_corrupt_file_is_cold_start_and_gets_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::in_dir(dir.path()));
    std::fs::write(store.path(), "][").unwrap();

    let clock = Arc::new(MockClock::new(t0()));
    let mut engine = engine_at(&clock, &store);
    assert_eq!(engine.used_sessions(), 0);

    engine.start_session().unwrap();
    assert_eq!(store.load_stats().unwrap().unwrap().used_sessions(), 1);
}

#[test]
fn test_unwritable_location_keeps_memory_state() {
    let dir = tempfile::tempdir().unwrap();
    // The parent "directory" is a regular file, so every save fails
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let store = Arc::new(JsonFileStore::in_dir(&blocker));

    let clock = Arc::new(MockClock::new(t0()));
    let mut engine = engine_at(&clock, &store);

    engine.start_session().unwrap();
    clock.advance(DEFAULT_SESSION_LIMIT);
    assert!(matches!(engine.tick(), TickOutcome::Expired(_)));

    assert_eq!(engine.used_sessions(), 1);
    assert!(engine.failed_writes() >= 2);
    assert!(!store.path().exists());
}

#[tokio::test(start_paused = true)]
async fn test_service_expires_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::in_dir(dir.path()));
    let clock = Arc::new(MockClock::new(t0()));

    let service = QuotaService::new(engine_at(&clock, &store), Duration::from_secs(1)).await;
    let mut rx = service.subscribe();

    let id = service.start_session().await.unwrap();
    clock.advance(DEFAULT_SESSION_LIMIT + Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(!service.is_ticking().await);

    let mut saw_expiry = false;
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::SessionEnded { session_id, reason, .. } = event {
            assert_eq!(session_id, id);
            assert_eq!(reason, SessionEndReason::Expired);
            saw_expiry = true;
        }
    }
    assert!(saw_expiry);

    let restored = engine_at(&clock, &store);
    assert!(restored.active_session().is_none());
    assert!(!restored.is_ticking());
    assert_eq!(restored.used_sessions(), 1);
}
