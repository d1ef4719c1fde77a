//! Core quota engine

use quota_api::{MonthlyStats, QuotaPolicy, Session, SessionEndReason, UsageSnapshot};
use quota_store::Store;
use quota_util::{Clock, QuotaError, QuotaResult, SessionId, YearMonth};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{EngineEvent, EVENT_CHANNEL_CAPACITY};

/// Result of closing a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopResult {
    pub session_id: SessionId,
    pub reason: SessionEndReason,
    pub duration: Duration,
}

/// What a tick observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session is active
    Idle,
    /// The active session is still within its limit
    Running {
        session_id: SessionId,
        remaining: Duration,
    },
    /// The active session reached its limit and was closed
    Expired(StopResult),
}

/// The quota engine
///
/// Owns the current month's record. Every mutation is written through the
/// store; write failures are logged and otherwise ignored.
pub struct QuotaEngine {
    policy: QuotaPolicy,
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    stats: MonthlyStats,
    ticking: bool,
    failed_writes: u64,
    events: broadcast::Sender<EngineEvent>,
}

impl QuotaEngine {
    /// Create an engine, restoring this month's record from `store` if there is one
    pub fn new(policy: QuotaPolicy, clock: Arc<dyn Clock>, store: Arc<dyn Store>) -> Self {
        let current = YearMonth::from_instant(&clock.now());
        let mut stats = MonthlyStats::new(current);

        match store.load_stats() {
            Ok(Some(saved)) if saved.year_month() == current => {
                info!(
                    year_month = %current,
                    used_sessions = saved.used_sessions(),
                    active = saved.active_session().is_some(),
                    "Stats restored"
                );
                stats = saved;
            }
            Ok(Some(saved)) => {
                info!(
                    saved_month = %saved.year_month(),
                    year_month = %current,
                    "Saved stats belong to another month, starting fresh"
                );
            }
            Ok(None) => {
                debug!(year_month = %current, "No saved stats, starting fresh");
            }
            Err(e) => {
                warn!(error = %e, "Saved stats unreadable, starting fresh");
            }
        }

        let ticking = stats.active_session().is_some();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(
            monthly_quota = policy.monthly_quota,
            session_limit_secs = policy.session_limit.as_secs(),
            "Quota engine initialized"
        );

        Self {
            policy,
            clock,
            store,
            stats,
            ticking,
            failed_writes: 0,
            events,
        }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &MonthlyStats {
        &self.stats
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.stats.active_session()
    }

    pub fn used_sessions(&self) -> u32 {
        self.stats.used_sessions()
    }

    pub fn remaining_sessions(&self) -> u32 {
        self.stats.remaining_sessions(self.policy.monthly_quota)
    }

    /// Whether periodic ticks should currently be delivered
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Number of saves that failed since startup
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    /// Current usage, evaluated at the clock's now
    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot::build(&self.stats, &self.policy, self.clock.now())
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// A sender handle, for subscribing without access to the engine
    pub fn event_sender(&self) -> broadcast::Sender<EngineEvent> {
        self.events.clone()
    }

    /// Start a new session.
    ///
    /// Resets the record first if the month has changed, so a new month
    /// always has its full quota.
    pub fn start_session(&mut self) -> QuotaResult<SessionId> {
        let now = self.clock.now();
        self.rollover_if_needed(now);

        if self.remaining_sessions() == 0 {
            debug!(
                used_sessions = self.used_sessions(),
                "Start refused, monthly quota reached"
            );
            return Err(QuotaError::QuotaReached {
                quota: self.policy.monthly_quota,
            });
        }

        let session_id = self.stats.open_session(now)?.id();
        self.ticking = true;
        self.persist();

        let remaining_sessions = self.remaining_sessions();
        info!(
            session_id = %session_id,
            used_sessions = self.used_sessions(),
            remaining_sessions,
            "Session started"
        );

        self.emit(EngineEvent::SessionStarted {
            session_id,
            started_at: now,
            remaining_sessions,
        });

        Ok(session_id)
    }

    /// Stop the active session
    pub fn stop_session(&mut self) -> QuotaResult<StopResult> {
        let now = self.clock.now();
        let result = self.close_active(now, SessionEndReason::Stopped)?;

        info!(
            session_id = %result.session_id,
            duration_secs = result.duration.as_secs(),
            "Session stopped"
        );

        Ok(result)
    }

    /// Advance time-driven state. Closes the active session once it reaches
    /// the session limit. Always emits [`EngineEvent::StateChanged`].
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now();
        let limit = self.policy.session_limit;
        let active = self
            .stats
            .active_session()
            .map(|s| (s.id(), s.duration(now)));

        let outcome = match active {
            None => {
                self.ticking = false;
                TickOutcome::Idle
            }
            Some((session_id, elapsed)) if elapsed >= limit => {
                match self.close_active(now, SessionEndReason::Expired) {
                    Ok(result) => {
                        info!(
                            session_id = %session_id,
                            duration_secs = result.duration.as_secs(),
                            "Session expired"
                        );
                        TickOutcome::Expired(result)
                    }
                    Err(_) => TickOutcome::Idle,
                }
            }
            Some((session_id, elapsed)) => TickOutcome::Running {
                session_id,
                remaining: limit.saturating_sub(elapsed),
            },
        };

        self.emit(EngineEvent::StateChanged);
        outcome
    }

    /// Count one message against the active session
    pub fn record_message(&mut self) -> QuotaResult<u32> {
        let count = self.stats.record_message()?;
        self.persist();

        debug!(message_count = count, "Message recorded");
        self.emit(EngineEvent::StateChanged);
        Ok(count)
    }

    fn rollover_if_needed(&mut self, now: chrono::DateTime<chrono::Utc>) {
        let current = YearMonth::from_instant(&now);
        let previous = self.stats.year_month();
        if previous == current {
            return;
        }

        info!(
            from = %previous,
            to = %current,
            dropped_sessions = self.used_sessions(),
            "Month rolled over, quota reset"
        );

        self.stats = MonthlyStats::new(current);
        self.ticking = false;
        self.emit(EngineEvent::MonthRolledOver {
            from: previous,
            to: current,
        });
    }

    fn close_active(
        &mut self,
        now: chrono::DateTime<chrono::Utc>,
        reason: SessionEndReason,
    ) -> QuotaResult<StopResult> {
        let session = self.stats.close_active(now)?;
        let result = StopResult {
            session_id: session.id(),
            reason,
            duration: session.duration(now),
        };

        self.ticking = false;
        self.persist();
        self.emit(EngineEvent::SessionEnded {
            session_id: result.session_id,
            reason,
            duration: result.duration,
        });

        Ok(result)
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save_stats(&self.stats) {
            self.failed_writes += 1;
            warn!(
                error = %e,
                failed_writes = self.failed_writes,
                "Failed to save stats, in-memory state kept"
            );
        }
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
