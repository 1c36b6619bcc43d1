//! Domain errors

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum UsageError {
    /// A usage group was attached to a subscription type that lacks a
    /// required capability, or a caller named a group that does not exist.
    /// Raised at construction/lookup time and never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An update targeted a record id no longer present in storage. The
    /// in-memory and persisted states have diverged; the whole batch is
    /// rolled back.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Rejected before touching storage: inverted intervals, negative
    /// quantities, inverted billing cycles.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// A storage backend failure, propagated verbatim after rollback.
    #[error("storage error: {0}")]
    Storage(String),
}
