//! Error types for quota operations

use thiserror::Error;

/// Failures returned by session start/stop.
///
/// The display strings are shown to users verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("Monthly quota of {quota} sessions reached")]
    QuotaReached { quota: u32 },

    #[error("A session is already active")]
    SessionAlreadyActive,

    #[error("No active session found")]
    NoActiveSession,
}

pub type QuotaResult<T> = std::result::Result<T, QuotaError>;
