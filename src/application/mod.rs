//! Application layer - use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases: it wires
//! usage types from a subscription's declared groups and exposes the
//! operations a billing process calls.

pub mod usage_service;

pub use usage_service::UsageService;
