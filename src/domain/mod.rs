//! Domain layer - core ledger logic and ports
//!
//! This layer contains:
//! - Entities: usage records
//! - Value Objects: billing cycles, identifiers, charges
//! - Repository Interfaces: the storage port for usage records
//! - Usage types: the Counter and Gauge reconciliation logic
//! - Collaborator ports: subscription capabilities and resolvers

pub mod billing_cycle;
pub mod shared;
pub mod subscription;
pub mod usage;

// Re-export commonly used types
pub use shared::{UsageError, Result};
