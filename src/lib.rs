//! Meterbook - a metered-usage interval ledger for recurring billing
//!
//! This is a Domain-Driven Design (DDD) implementation of usage tracking
//! against time-bounded billing cycles: raw usage events are reconciled into
//! a consistent, non-overlapping record timeline that charge computation can
//! consume.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use domain::shared::error::UsageError;
pub use domain::shared::result::Result;
