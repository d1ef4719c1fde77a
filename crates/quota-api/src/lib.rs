//! Shared data model for the quota tracker
//!
//! This crate defines the types every other layer agrees on:
//! - Sessions and their lifecycle state
//! - The per-month statistics record
//! - Limits and the read-only usage snapshot handed to presentation layers

mod types;

pub use types::*;
