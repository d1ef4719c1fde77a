//! Quota engine and session state machine for the quota tracker
//!
//! This crate is the heart of the tracker, containing:
//! - The monthly quota check and month rollover
//! - Session state machine (Absent -> Active -> Closed)
//! - Auto-expiry of sessions that reach the length limit
//! - Change notifications for presentation layers
//! - The cancellable tick scheduler that drives expiry

mod engine;
mod events;
mod service;

pub use engine::*;
pub use events::*;
pub use service::*;
