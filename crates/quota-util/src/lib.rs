//! Shared utilities for the quota tracker
//!
//! This crate provides:
//! - ID types (SessionId)
//! - The clock seam and calendar-month bucketing
//! - Error types for quota operations
//! - Default paths for data and config

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
