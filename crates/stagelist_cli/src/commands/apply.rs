//! Apply command implementation.
//!
//! Reads a JSON array of operations, stages them in order against the file
//! store and commits them as one transaction. The first rejected operation
//! discards the whole transaction.

use super::CliError;
use serde::Deserialize;
use stagelist_core::schedule::{Schedule, ScheduleLimits, ScheduleRules};
use stagelist_core::{
    EngineConfig, Entry, EntryChanges, Handle, Status, TransactionCoordinator, TxnError,
    TxnResult,
};
use stagelist_store::{EntryStore, FileStore};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One staged operation as written in the operations file.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Append a schedule, or edit one when the entry carries a handle.
    Append {
        /// The schedule entry.
        entry: Entry<Schedule>,
    },
    /// Replace the schedule with `handle`.
    Edit {
        /// Hex handle of the schedule.
        handle: String,
        /// Replacement content.
        changes: EntryChanges<Schedule>,
    },
    /// Remove the schedule with `handle`.
    Delete {
        /// Hex handle of the schedule.
        handle: String,
    },
}

impl Operation {
    fn stage<S>(self, coordinator: &mut TransactionCoordinator<Schedule, ScheduleRules, S>) -> TxnResult<()>
    where
        S: EntryStore<Entry<Schedule>>,
    {
        match self {
            Self::Append { entry } => coordinator.append(entry).map(|assigned| {
                if let Some(handle) = assigned {
                    info!("Staged schedule {}", handle);
                }
            }),
            Self::Edit { handle, changes } => coordinator.edit(&client_handle(&handle)?, changes),
            Self::Delete { handle } => coordinator.delete(&client_handle(&handle)?),
        }
    }
}

/// A malformed handle is client input that violates the list's rules.
fn client_handle(text: &str) -> TxnResult<Handle> {
    parse_handle(text).map_err(|e| TxnError::constraint(e.to_string()))
}

/// Parses a handle written as hex bytes.
pub fn parse_handle(text: &str) -> Result<Handle, CliError> {
    let bad = || CliError::BadHandle(text.to_string());
    if text.is_empty() || text.len() % 2 != 0 {
        return Err(bad());
    }

    let bytes = (0..text.len())
        .step_by(2)
        .map(|i| {
            text.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(bad)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Handle::from_bytes(bytes))
}

/// Runs the apply command and returns the transaction's final status.
pub fn run(
    store_path: &Path,
    limits_path: &Path,
    ops_path: &Path,
    assign_handles: bool,
) -> Result<Status, Box<dyn std::error::Error>> {
    let limits: ScheduleLimits = serde_json::from_str(&fs::read_to_string(limits_path)?)?;
    let operations: Vec<Operation> = serde_json::from_str(&fs::read_to_string(ops_path)?)?;
    info!("Applying {} operations to {:?}", operations.len(), store_path);

    let store: FileStore<Entry<Schedule>> = FileStore::open(store_path)?;
    let config = EngineConfig::new().assign_handles(assign_handles);
    let mut coordinator = TransactionCoordinator::new(store, ScheduleRules::new(limits), config);

    Ok(apply(&mut coordinator, operations))
}

/// Stages `operations` in order and commits them.
pub fn apply<S>(
    coordinator: &mut TransactionCoordinator<Schedule, ScheduleRules, S>,
    operations: Vec<Operation>,
) -> Status
where
    S: EntryStore<Entry<Schedule>>,
{
    for (index, operation) in operations.into_iter().enumerate() {
        let status = Status::from_result(&operation.stage(coordinator));
        if !status.is_success() {
            warn!("Operation {} rejected with {}", index, status);
            coordinator.discard();
            return status;
        }
    }

    Status::from_result(&coordinator.commit())
}
