//! Domain result type

use crate::domain::shared::error::UsageError;

pub type Result<T> = std::result::Result<T, UsageError>;
