//! # StageList Core
//!
//! Staged list transaction engine for StageList.
//!
//! This crate provides:
//! - The entry data model (`Entry`, `Handle`, `EntryChanges`)
//! - Pluggable per-attribute rules (`EntryRules`) with thermostat schedules
//!   as the built-in example
//! - A bounded, restartable scan over an entry store
//! - Validation of staged adds, edits and deletes
//! - A per-entity transaction coordinator with atomic commit
//! - A registry tying coordinators to managed entities
//!
//! ## Example
//!
//! ```rust
//! use stagelist_core::{EngineConfig, Entry, Status, TransactionCoordinator};
//! use stagelist_core::schedule::{
//!     Schedule, ScheduleLimits, ScheduleRules, ScheduleTransition, ScheduleType, SystemMode,
//! };
//! use stagelist_store::InMemoryStore;
//!
//! let limits = ScheduleLimits {
//!     number_of_schedules: 4,
//!     number_of_schedule_transitions: 8,
//!     number_of_schedule_transitions_per_day: None,
//!     schedule_types: vec![ScheduleType {
//!         system_mode: SystemMode::Heat,
//!         number_of_schedules: 2,
//!         supports_names: true,
//!         supports_presets: false,
//!         supports_setpoints: true,
//!         supports_off: false,
//!     }],
//! };
//! let mut coordinator = TransactionCoordinator::new(
//!     InMemoryStore::new(),
//!     ScheduleRules::new(limits),
//!     EngineConfig::default(),
//! );
//!
//! let schedule = Schedule::new(
//!     SystemMode::Heat,
//!     vec![ScheduleTransition::to_heating(0x7F, 420, 2100)],
//! );
//! let result = coordinator.append(Entry::new(schedule));
//! assert_eq!(Status::from_result(&result), Status::Success);
//! assert_eq!(Status::from_result(&coordinator.commit()), Status::Success);
//! assert_eq!(coordinator.committed_entries().unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod registry;
mod rules;
mod scan;
pub mod schedule;
mod transaction;
mod types;
mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::EngineConfig;
pub use error::{Status, TxnError, TxnResult};
pub use registry::{CoordinatorRegistry, SharedCoordinator};
pub use rules::EntryRules;
pub use scan::{IndexScan, Snapshot};
pub use transaction::{
    DeleteTarget, PendingOverlay, PendingWrite, Transaction, TransactionCoordinator,
    TransactionState,
};
pub use types::{Entry, EntryChanges, Handle, SessionId, TransactionId};
pub use validator::Validator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
