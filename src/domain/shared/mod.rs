//! Shared kernel - common types used across the domain

pub mod error;
pub mod result;
pub mod value_objects;

pub use error::UsageError;
pub use result::Result;
pub use value_objects::*;
