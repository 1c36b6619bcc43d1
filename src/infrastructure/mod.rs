//! Infrastructure layer - technical implementations
//!
//! This layer contains the storage adapters behind the domain's
//! `UsageRecordStore` port.

pub mod persistence;
