//! Tick scheduling around the engine
//!
//! `QuotaService` serializes every engine call behind one async mutex and
//! owns the periodic tick task. The task runs only while a session is active:
//! it is spawned when a session starts (or is restored) and aborted when the
//! session is stopped or expires.

use quota_api::{MonthlyStats, UsageSnapshot};
use quota_util::{QuotaResult, SessionId};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::{EngineEvent, QuotaEngine, StopResult, TickOutcome};

struct Ticker {
    session_id: SessionId,
    handle: JoinHandle<()>,
}

struct Shared {
    engine: QuotaEngine,
    ticker: Option<Ticker>,
}

/// Engine plus its tick scheduler
pub struct QuotaService {
    shared: Arc<Mutex<Shared>>,
    events: broadcast::Sender<EngineEvent>,
    tick_interval: Duration,
}

impl QuotaService {
    /// Wrap `engine`. Starts ticking right away if a restored session is active.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(engine: QuotaEngine, tick_interval: Duration) -> Self {
        let events = engine.event_sender();
        let service = Self {
            shared: Arc::new(Mutex::new(Shared {
                engine,
                ticker: None,
            })),
            events,
            tick_interval,
        };

        {
            let mut shared = service.shared.lock().await;
            service.sync_ticker(&mut shared);
        }

        service
    }

    /// Subscribe to change notifications. Does not touch the engine lock.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn start_session(&self) -> QuotaResult<SessionId> {
        let mut shared = self.shared.lock().await;
        let result = shared.engine.start_session();
        self.sync_ticker(&mut shared);
        result
    }

    pub async fn stop_session(&self) -> QuotaResult<StopResult> {
        let mut shared = self.shared.lock().await;
        let result = shared.engine.stop_session();
        self.sync_ticker(&mut shared);
        result
    }

    pub async fn record_message(&self) -> QuotaResult<u32> {
        let mut shared = self.shared.lock().await;
        shared.engine.record_message()
    }

    /// Run a tick immediately, outside the schedule
    pub async fn tick_now(&self) -> TickOutcome {
        let mut shared = self.shared.lock().await;
        let outcome = shared.engine.tick();
        self.sync_ticker(&mut shared);
        outcome
    }

    pub async fn snapshot(&self) -> UsageSnapshot {
        self.shared.lock().await.engine.snapshot()
    }

    pub async fn stats(&self) -> MonthlyStats {
        self.shared.lock().await.engine.stats().clone()
    }

    /// Whether a tick task is currently scheduled
    pub async fn is_ticking(&self) -> bool {
        let shared = self.shared.lock().await;
        shared
            .ticker
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Stop the tick task. The active session, if any, stays active.
    pub async fn shutdown(&self) {
        let mut shared = self.shared.lock().await;
        if let Some(ticker) = shared.ticker.take() {
            ticker.handle.abort();
            debug!(session_id = %ticker.session_id, "Tick task stopped for shutdown");
        }
    }

    /// Make the tick task match the engine: one task for the active session, none otherwise.
    fn sync_ticker(&self, shared: &mut Shared) {
        let wanted = if shared.engine.is_ticking() {
            shared.engine.stats().active_session_id()
        } else {
            None
        };

        if let Some(ticker) = &shared.ticker
            && Some(ticker.session_id) == wanted
            && !ticker.handle.is_finished()
        {
            return;
        }

        if let Some(old) = shared.ticker.take() {
            old.handle.abort();
            debug!(session_id = %old.session_id, "Tick task stopped");
        }

        if let Some(session_id) = wanted {
            let handle = tokio::spawn(run_ticker(
                Arc::downgrade(&self.shared),
                session_id,
                self.tick_interval,
            ));
            shared.ticker = Some(Ticker { session_id, handle });
            debug!(
                session_id = %session_id,
                interval_ms = self.tick_interval.as_millis() as u64,
                "Tick task started"
            );
        }
    }
}

impl Drop for QuotaService {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.try_lock()
            && let Some(ticker) = shared.ticker.take()
        {
            ticker.handle.abort();
        }
    }
}

async fn run_ticker(shared: Weak<Mutex<Shared>>, session_id: SessionId, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let mut guard = shared.lock().await;

        // Stop or expiry may have won the lock first
        if !guard.engine.is_ticking() || guard.engine.stats().active_session_id() != Some(session_id)
        {
            break;
        }

        guard.engine.tick();

        if !guard.engine.is_ticking() {
            if guard
                .ticker
                .as_ref()
                .is_some_and(|t| t.session_id == session_id)
            {
                // Detach our own handle; the task ends right after this
                guard.ticker = None;
            }
            debug!(session_id = %session_id, "Tick task finished");
            break;
        }
    }
}
