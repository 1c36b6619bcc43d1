//! Usage bounded context - the interval ledger and its reconciliation rules

pub mod charge;
pub mod counter;
pub mod gauge;
pub mod group;
pub mod history;
pub mod locks;
pub mod record;
pub mod repository;
pub mod usage_type;

pub use charge::Charge;
pub use counter::CounterUsage;
pub use gauge::GaugeUsage;
pub use group::{UsageGroup, UsageKind};
pub use history::usage_history;
pub use locks::UsageLockRegistry;
pub use record::UsageRecord;
pub use repository::UsageRecordStore;
pub use usage_type::UsageType;
