//! Session and monthly statistics model

use chrono::{DateTime, Utc};
use quota_util::{duration_between, QuotaError, QuotaResult, SessionId, YearMonth};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Sessions allowed per calendar month unless configured otherwise
pub const DEFAULT_MONTHLY_QUOTA: u32 = 50;

/// Maximum length of a single session unless configured otherwise
pub const DEFAULT_SESSION_LIMIT: Duration = Duration::from_secs(5 * 60 * 60);

/// Messages shown as the per-session budget. Displayed, not enforced.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 250;

/// Limits enforced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    pub monthly_quota: u32,
    pub session_limit: Duration,
    pub message_limit: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            monthly_quota: DEFAULT_MONTHLY_QUOTA,
            session_limit: DEFAULT_SESSION_LIMIT,
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }
}

/// Lifecycle state of a session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Closed { end: DateTime<Utc> },
}

/// Why a session was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// Closed by an explicit stop request
    Stopped,
    /// Closed by the tick after reaching the session limit
    Expired,
}

/// One tracked usage window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    start: DateTime<Utc>,
    state: SessionState,
    message_count: u32,
}

impl Session {
    /// A fresh active session
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            start,
            state: SessionState::Active,
            message_count: 0,
        }
    }

    /// Rebuild a session from persisted fields
    pub fn restore(
        id: SessionId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        message_count: u32,
    ) -> Self {
        let state = match end {
            Some(end) => SessionState::Closed { end },
            None => SessionState::Active,
        };
        Self {
            id,
            start,
            state,
            message_count,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::Active => None,
            SessionState::Closed { end } => Some(end),
        }
    }

    pub fn message_count(&self) -> u32 {
        self.message_count
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Time from start to end, or to `now` while active. Never negative.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        duration_between(self.start, self.end().unwrap_or(now))
    }

    /// Time left before `limit` is reached
    pub fn remaining(&self, now: DateTime<Utc>, limit: Duration) -> Duration {
        limit.saturating_sub(self.duration(now))
    }

    /// Fraction of `limit` used so far, in `[0, 1]`
    pub fn progress(&self, now: DateTime<Utc>, limit: Duration) -> f64 {
        if limit.is_zero() {
            return 1.0;
        }
        let remaining = self.remaining(now, limit).as_secs_f64();
        (1.0 - remaining / limit.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn close(&mut self, at: DateTime<Utc>) {
        if self.is_active() {
            self.state = SessionState::Closed { end: at };
        }
    }
}

/// A persisted record that breaks the model's invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Invalid month {0} in record")]
    InvalidMonth(u32),

    #[error("{0} sessions are active, at most one is allowed")]
    MultipleActive(usize),
}

/// Per-month usage record. Sessions are append-only, in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyStats {
    year_month: YearMonth,
    sessions: Vec<Session>,
    /// The only active session, if any
    active: Option<SessionId>,
}

impl MonthlyStats {
    /// An empty record for `year_month`
    pub fn new(year_month: YearMonth) -> Self {
        Self {
            year_month,
            sessions: Vec::new(),
            active: None,
        }
    }

    /// Rebuild a record from persisted sessions, enforcing the at-most-one-active rule
    pub fn from_sessions(
        year_month: YearMonth,
        sessions: Vec<Session>,
    ) -> Result<Self, RecordError> {
        if !year_month.is_valid() {
            return Err(RecordError::InvalidMonth(year_month.month));
        }

        let mut active = sessions.iter().filter(|s| s.is_active());
        let first_active = active.next().map(Session::id);
        let extra = active.count();
        if extra > 0 {
            return Err(RecordError::MultipleActive(extra + 1));
        }

        Ok(Self {
            year_month,
            sessions,
            active: first_active,
        })
    }

    pub fn year_month(&self) -> YearMonth {
        self.year_month
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn used_sessions(&self) -> u32 {
        u32::try_from(self.sessions.len()).unwrap_or(u32::MAX)
    }

    pub fn remaining_sessions(&self, quota: u32) -> u32 {
        quota.saturating_sub(self.used_sessions())
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active_session(&self) -> Option<&Session> {
        let id = self.active?;
        self.sessions.iter().rev().find(|s| s.id == id)
    }

    fn active_session_mut(&mut self) -> Option<&mut Session> {
        let id = self.active?;
        self.sessions.iter_mut().rev().find(|s| s.id == id)
    }

    /// Append a new active session starting at `start`
    pub fn open_session(&mut self, start: DateTime<Utc>) -> QuotaResult<&Session> {
        if self.active.is_some() {
            return Err(QuotaError::SessionAlreadyActive);
        }

        let session = Session::new(start);
        self.active = Some(session.id);
        self.sessions.push(session);
        Ok(&self.sessions[self.sessions.len() - 1])
    }

    /// Close the active session at `at`
    pub fn close_active(&mut self, at: DateTime<Utc>) -> QuotaResult<&Session> {
        let id = self.active.ok_or(QuotaError::NoActiveSession)?;
        let index = self
            .sessions
            .iter()
            .rposition(|s| s.id == id)
            .ok_or(QuotaError::NoActiveSession)?;

        self.sessions[index].close(at);
        self.active = None;
        Ok(&self.sessions[index])
    }

    /// Bump the message counter of the active session
    pub fn record_message(&mut self) -> QuotaResult<u32> {
        let session = self
            .active_session_mut()
            .ok_or(QuotaError::NoActiveSession)?;
        session.message_count = session.message_count.saturating_add(1);
        Ok(session.message_count)
    }
}

/// The active session as shown to a presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSessionView {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub remaining: Duration,
    pub progress: f64,
    pub message_count: u32,
}

/// Read-only view of the current month's usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub year_month: YearMonth,
    pub used_sessions: u32,
    pub remaining_sessions: u32,
    pub monthly_quota: u32,
    pub session_limit: Duration,
    pub message_limit: u32,
    pub active: Option<ActiveSessionView>,
}

impl UsageSnapshot {
    pub fn build(stats: &MonthlyStats, policy: &QuotaPolicy, now: DateTime<Utc>) -> Self {
        let active = stats.active_session().map(|s| ActiveSessionView {
            session_id: s.id(),
            started_at: s.start(),
            elapsed: s.duration(now),
            remaining: s.remaining(now, policy.session_limit),
            progress: s.progress(now, policy.session_limit),
            message_count: s.message_count(),
        });

        Self {
            year_month: stats.year_month(),
            used_sessions: stats.used_sessions(),
            remaining_sessions: stats.remaining_sessions(policy.monthly_quota),
            monthly_quota: policy.monthly_quota,
            session_limit: policy.session_limit,
            message_limit: policy.message_limit,
            active,
        }
    }
}
