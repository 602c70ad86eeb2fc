//! Test fixtures and store helpers.
//!
//! Provides a simple tagged payload with configurable rules, plus entry
//! stores that misbehave in the ways a real delegate can.

use serde::{Deserialize, Serialize};
use stagelist_core::{
    EngineConfig, Entry, EntryRules, Handle, TransactionCoordinator, TxnError, TxnResult,
};
use stagelist_store::{EntryStore, FileStore, InMemoryStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Payload used throughout the tests: a category tag and a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tagged {
    /// Quota category.
    pub tag: String,
    /// Arbitrary value.
    pub value: u32,
}

/// Entry carrying a [`Tagged`] payload.
pub type TestEntry = Entry<Tagged>;

/// Coordinator over an in-memory store with [`TaggedRules`].
pub type TestCoordinator = TransactionCoordinator<Tagged, TaggedRules, InMemoryStore<TestEntry>>;

/// Rules where an entry's category is its tag.
///
/// Tags without a limit are unsupported. Values above `max_value` are
/// rejected as malformed.
#[derive(Debug, Clone)]
pub struct TaggedRules {
    max_entries: usize,
    limits: HashMap<String, usize>,
    max_value: u32,
}

impl TaggedRules {
    /// Creates rules allowing `max_entries` entries and no tags.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            limits: HashMap::new(),
            max_value: u32::MAX,
        }
    }

    /// Allows up to `limit` entries tagged `tag`.
    #[must_use]
    pub fn with_limit(mut self, tag: &str, limit: usize) -> Self {
        self.limits.insert(tag.to_string(), limit);
        self
    }

    /// Rejects entries whose value exceeds `max_value`.
    #[must_use]
    pub fn with_max_value(mut self, max_value: u32) -> Self {
        self.max_value = max_value;
        self
    }
}

impl EntryRules<Tagged> for TaggedRules {
    type Category = String;

    fn category_of(&self, entry: &TestEntry) -> String {
        entry.payload.tag.clone()
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn max_per_category(&self, category: &String) -> usize {
        self.limits.get(category).copied().unwrap_or(0)
    }

    fn check_entry(&self, entry: &TestEntry) -> TxnResult<()> {
        if entry.payload.value > self.max_value {
            return Err(TxnError::constraint(format!(
                "value {} exceeds {}",
                entry.payload.value, self.max_value
            )));
        }
        Ok(())
    }
}

/// Creates a new entry with no handle.
pub fn tagged(tag: &str, value: u32) -> TestEntry {
    Entry::new(Tagged {
        tag: tag.to_string(),
        value,
    })
}

/// Creates a committed entry with a one-byte handle.
pub fn committed(handle: u8, tag: &str, built_in: bool) -> TestEntry {
    tagged(tag, u32::from(handle))
        .with_handle(Handle::from_bytes(vec![handle]))
        .with_built_in(built_in)
}

/// Returns the one-byte handle used by [`committed`].
pub fn handle(byte: u8) -> Handle {
    Handle::from_bytes(vec![byte])
}

/// Creates a coordinator over an in-memory store holding `entries`.
pub fn coordinator(
    entries: Vec<TestEntry>,
    rules: TaggedRules,
    config: EngineConfig,
) -> TestCoordinator {
    TransactionCoordinator::new(InMemoryStore::with_entries(entries), rules, config)
}

/// Store whose entry at one index has lost its built-in flag.
pub struct MissingBuiltInStore {
    inner: InMemoryStore<TestEntry>,
    corrupt_index: usize,
}

impl MissingBuiltInStore {
    /// Serves `entries`, with the built-in flag at `corrupt_index` missing.
    pub fn new(entries: Vec<TestEntry>, corrupt_index: usize) -> Self {
        Self {
            inner: InMemoryStore::with_entries(entries),
            corrupt_index,
        }
    }

    /// Returns the entries as stored.
    pub fn stored(&self) -> Vec<TestEntry> {
        self.inner.snapshot().to_vec()
    }
}

impl EntryStore<TestEntry> for MissingBuiltInStore {
    fn entry_at(&self, index: usize) -> StoreResult<Option<TestEntry>> {
        let entry = self.inner.entry_at(index)?;
        Ok(entry.map(|mut entry| {
            if index == self.corrupt_index {
                entry.built_in = None;
            }
            entry
        }))
    }

    fn revision(&self) -> StoreResult<u64> {
        self.inner.revision()
    }

    fn append_to_pending_list(&mut self, entry: TestEntry) -> StoreResult<()> {
        self.inner.append_to_pending_list(entry)
    }

    fn commit_pending_list(&mut self) -> StoreResult<()> {
        self.inner.commit_pending_list()
    }

    fn clear_pending_list(&mut self) -> StoreResult<()> {
        self.inner.clear_pending_list()
    }
}

/// Store whose every call fails.
#[derive(Debug, Default)]
pub struct UnreachableStore;

impl UnreachableStore {
    fn error() -> StoreError {
        StoreError::Unavailable("delegate unreachable".into())
    }
}

impl EntryStore<TestEntry> for UnreachableStore {
    fn entry_at(&self, _index: usize) -> StoreResult<Option<TestEntry>> {
        Err(Self::error())
    }

    fn revision(&self) -> StoreResult<u64> {
        Err(Self::error())
    }

    fn append_to_pending_list(&mut self, _entry: TestEntry) -> StoreResult<()> {
        Err(Self::error())
    }

    fn commit_pending_list(&mut self) -> StoreResult<()> {
        Err(Self::error())
    }

    fn clear_pending_list(&mut self) -> StoreResult<()> {
        Err(Self::error())
    }
}

/// Store that never reports exhaustion.
pub struct RunawayStore {
    template: TestEntry,
    reads: AtomicUsize,
}

impl RunawayStore {
    /// Serves `template` at every index.
    pub fn new(template: TestEntry) -> Self {
        Self {
            template,
            reads: AtomicUsize::new(0),
        }
    }

    /// Returns how many indices have been read.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl EntryStore<TestEntry> for RunawayStore {
    fn entry_at(&self, _index: usize) -> StoreResult<Option<TestEntry>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.template.clone()))
    }

    fn revision(&self) -> StoreResult<u64> {
        Ok(0)
    }

    fn append_to_pending_list(&mut self, _entry: TestEntry) -> StoreResult<()> {
        Ok(())
    }

    fn commit_pending_list(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn clear_pending_list(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Store whose committed list is rewritten while it is being read.
///
/// After `shift_at` reads the list is replaced with an identical copy,
/// which bumps the revision.
pub struct ShiftingStore {
    inner: InMemoryStore<TestEntry>,
    reads: AtomicUsize,
    shift_at: usize,
}

impl ShiftingStore {
    /// Serves `entries` and shifts on read number `shift_at`.
    pub fn new(entries: Vec<TestEntry>, shift_at: usize) -> Self {
        Self {
            inner: InMemoryStore::with_entries(entries),
            reads: AtomicUsize::new(0),
            shift_at,
        }
    }

    /// Returns the entries as stored.
    pub fn stored(&self) -> Vec<TestEntry> {
        self.inner.snapshot().to_vec()
    }
}

impl EntryStore<TestEntry> for ShiftingStore {
    fn entry_at(&self, index: usize) -> StoreResult<Option<TestEntry>> {
        if self.reads.fetch_add(1, Ordering::SeqCst) + 1 == self.shift_at {
            self.inner.replace_committed(self.stored());
        }
        self.inner.entry_at(index)
    }

    fn revision(&self) -> StoreResult<u64> {
        self.inner.revision()
    }

    fn append_to_pending_list(&mut self, entry: TestEntry) -> StoreResult<()> {
        self.inner.append_to_pending_list(entry)
    }

    fn commit_pending_list(&mut self) -> StoreResult<()> {
        self.inner.commit_pending_list()
    }

    fn clear_pending_list(&mut self) -> StoreResult<()> {
        self.inner.clear_pending_list()
    }
}

/// Store that reads fine but refuses to commit.
pub struct FailingCommitStore {
    inner: InMemoryStore<TestEntry>,
    clears: usize,
}

impl FailingCommitStore {
    /// Serves `entries` and fails every commit.
    pub fn new(entries: Vec<TestEntry>) -> Self {
        Self {
            inner: InMemoryStore::with_entries(entries),
            clears: 0,
        }
    }

    /// Returns the committed entries.
    pub fn stored(&self) -> Vec<TestEntry> {
        self.inner.snapshot().to_vec()
    }

    /// Returns the number of entries left in the pending list.
    pub fn pending_len(&self) -> usize {
        self.inner.pending_len()
    }

    /// Returns how many times the pending list was cleared.
    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl EntryStore<TestEntry> for FailingCommitStore {
    fn entry_at(&self, index: usize) -> StoreResult<Option<TestEntry>> {
        self.inner.entry_at(index)
    }

    fn revision(&self) -> StoreResult<u64> {
        self.inner.revision()
    }

    fn append_to_pending_list(&mut self, entry: TestEntry) -> StoreResult<()> {
        self.inner.append_to_pending_list(entry)
    }

    fn commit_pending_list(&mut self) -> StoreResult<()> {
        Err(StoreError::Unavailable("commit refused".into()))
    }

    fn clear_pending_list(&mut self) -> StoreResult<()> {
        self.clears += 1;
        self.inner.clear_pending_list()
    }
}

/// Runs a test with a file store in a temporary directory.
///
/// The directory path is passed along so the test can reopen the store
/// after dropping it.
pub fn with_temp_file_store<F, R>(f: F) -> R
where
    F: FnOnce(FileStore<TestEntry>, &Path) -> R,
{
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = FileStore::open(temp_dir.path()).expect("Failed to open file store");
    f(store, temp_dir.path())
}
