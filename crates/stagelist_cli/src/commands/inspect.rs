//! Inspect command implementation.

use super::CliError;
use serde::Serialize;
use stagelist_core::schedule::Schedule;
use stagelist_core::Entry;
use stagelist_store::{EntryStore, FileStore, STORE_FILE_NAME};
use std::path::Path;
use tracing::info;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// Committed revision.
    pub revision: u64,
    /// Committed schedules in list order.
    pub schedules: Vec<Entry<Schedule>>,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Inspecting store at {:?}", path);
    let result = inspect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Reads the committed schedules of the store at `path`.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    if !path.join(STORE_FILE_NAME).exists() {
        return Err(CliError::NoStore(path.to_path_buf()).into());
    }

    let store: FileStore<Entry<Schedule>> = FileStore::open(path)?;
    Ok(InspectResult {
        path: path.display().to_string(),
        revision: store.revision()?,
        schedules: store.entries().to_vec(),
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!("Revision: {}", result.revision);
    println!("Schedules: {}", result.schedules.len());

    for (index, entry) in result.schedules.iter().enumerate() {
        let handle = entry
            .handle
            .as_ref()
            .map_or_else(|| "null".to_string(), ToString::to_string);
        let built_in = match entry.built_in {
            Some(true) => "yes",
            Some(false) => "no",
            None => "MISSING",
        };
        let schedule = &entry.payload;
        println!(
            "  [{index}] handle={handle} built_in={built_in} mode={:?} transitions={}",
            schedule.system_mode,
            schedule.transitions.len()
        );
        if let Some(name) = &schedule.name {
            println!("        name: {name}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagelist_core::schedule::{ScheduleTransition, SystemMode};
    use tempfile::tempdir;

    #[test]
    fn inspect_missing_store_fails() {
        let dir = tempdir().unwrap();
        assert!(inspect(dir.path()).is_err());
    }

    #[test]
    fn inspect_reads_committed_schedules() {
        let dir = tempdir().unwrap();
        {
            let mut store: FileStore<Entry<Schedule>> = FileStore::open(dir.path()).unwrap();
            let schedule = Schedule::new(
                SystemMode::Heat,
                vec![ScheduleTransition::to_heating(0x7F, 360, 2000)],
            );
            store
                .append_to_pending_list(Entry::new(schedule).with_built_in(true))
                .unwrap();
            store.commit_pending_list().unwrap();
        }

        let result = inspect(dir.path()).unwrap();
        assert_eq!(result.revision, 1);
        assert_eq!(result.schedules.len(), 1);
        assert!(result.schedules[0].is_built_in());
    }
}
