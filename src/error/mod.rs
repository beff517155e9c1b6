//! Error handling
//!
//! Defines error types and handling for the quota manager.

pub mod types;

pub use types::*;
