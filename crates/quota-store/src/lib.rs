//! Persistence layer for the quota tracker
//!
//! Provides:
//! - The JSON codec for the monthly stats record
//! - The `Store` trait the engine writes through
//! - A file-backed store (whole-record overwrite, optional per-month archive)
//! - An in-memory store for tests

mod codec;
mod json_file;
mod memory;
mod traits;

pub use codec::*;
pub use json_file::*;
pub use memory::*;
pub use traits::*;

use quota_api::RecordError;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt record: {0}")]
    Corrupt(#[from] RecordError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
