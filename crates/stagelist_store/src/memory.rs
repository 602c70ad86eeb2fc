//! In-memory entry store for testing.

use crate::error::StoreResult;
use crate::store::EntryStore;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug)]
struct Committed<T> {
    entries: Arc<Vec<T>>,
    revision: u64,
}

/// An in-memory entry store.
///
/// This store keeps the committed list in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Attributes that don't need persistence
///
/// # Thread Safety
///
/// The committed list lives behind a lock shared with every
/// [`StoreReader`]. A commit swaps an `Arc` under that lock, so readers
/// observe either the old list or the new one.
///
/// # Example
///
/// ```rust
/// use stagelist_store::{EntryStore, InMemoryStore};
///
/// let store = InMemoryStore::with_entries(vec![1, 2, 3]);
/// assert_eq!(store.entry_at(2).unwrap(), Some(3));
/// assert_eq!(store.revision().unwrap(), 0);
/// ```
#[derive(Debug)]
pub struct InMemoryStore<T> {
    committed: Arc<RwLock<Committed<T>>>,
    pending: Vec<T>,
}

impl<T> InMemoryStore<T> {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_entries(Vec::new())
    }

    /// Creates a store whose committed list is `entries`.
    ///
    /// Useful for seeding device-provisioned entries in tests.
    #[must_use]
    pub fn with_entries(entries: Vec<T>) -> Self {
        Self {
            committed: Arc::new(RwLock::new(Committed {
                entries: Arc::new(entries),
                revision: 0,
            })),
            pending: Vec::new(),
        }
    }

    /// Returns a shared handle to the committed list.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.committed.read().entries)
    }

    /// Returns a reader that observes this store's committed list.
    #[must_use]
    pub fn reader(&self) -> StoreReader<T> {
        StoreReader {
            committed: Arc::clone(&self.committed),
        }
    }

    /// Returns the number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.read().entries.len()
    }

    /// Returns true if the committed list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of entries waiting in the pending list.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Replaces the committed list outside of any transaction.
    ///
    /// This models another writer (a factory reset, a local UI) touching
    /// the list and is mostly useful for tests.
    pub fn replace_committed(&self, entries: Vec<T>) {
        let mut committed = self.committed.write();
        committed.entries = Arc::new(entries);
        committed.revision += 1;
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> EntryStore<T> for InMemoryStore<T> {
    fn entry_at(&self, index: usize) -> StoreResult<Option<T>> {
        Ok(self.committed.read().entries.get(index).cloned())
    }

    fn revision(&self) -> StoreResult<u64> {
        Ok(self.committed.read().revision)
    }

    fn append_to_pending_list(&mut self, entry: T) -> StoreResult<()> {
        self.pending.push(entry);
        Ok(())
    }

    fn commit_pending_list(&mut self) -> StoreResult<()> {
        let entries = Arc::new(std::mem::take(&mut self.pending));
        let mut committed = self.committed.write();
        committed.entries = entries;
        committed.revision += 1;
        Ok(())
    }

    fn clear_pending_list(&mut self) -> StoreResult<()> {
        self.pending.clear();
        Ok(())
    }
}

/// A read-only view of an [`InMemoryStore`]'s committed list.
///
/// Readers can live on other threads while a transaction commits.
#[derive(Debug)]
pub struct StoreReader<T> {
    committed: Arc<RwLock<Committed<T>>>,
}

impl<T> StoreReader<T> {
    /// Returns the committed list as of this call.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.committed.read().entries)
    }

    /// Returns the committed revision as of this call.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.committed.read().revision
    }
}

impl<T> Clone for StoreReader<T> {
    fn clone(&self) -> Self {
        Self {
            committed: Arc::clone(&self.committed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store: InMemoryStore<u32> = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.entry_at(0).unwrap(), None);
        assert_eq!(store.revision().unwrap(), 0);
    }

    #[test]
    fn memory_entry_at_signals_exhaustion() {
        let store = InMemoryStore::with_entries(vec!["a", "b"]);
        assert_eq!(store.entry_at(0).unwrap(), Some("a"));
        assert_eq!(store.entry_at(1).unwrap(), Some("b"));
        assert_eq!(store.entry_at(2).unwrap(), None);
        assert_eq!(store.entry_at(usize::MAX).unwrap(), None);
    }

    #[test]
    fn memory_pending_is_invisible_until_commit() {
        let mut store = InMemoryStore::with_entries(vec![1]);
        store.append_to_pending_list(7).unwrap();
        store.append_to_pending_list(8).unwrap();

        assert_eq!(store.pending_len(), 2);
        assert_eq!(store.entry_at(0).unwrap(), Some(1));
        assert_eq!(store.entry_at(1).unwrap(), None);
    }

    #[test]
    fn memory_commit_replaces_committed_list() {
        let mut store = InMemoryStore::with_entries(vec![1, 2, 3]);
        store.append_to_pending_list(9).unwrap();
        store.commit_pending_list().unwrap();

        assert_eq!(store.snapshot().as_slice(), &[9]);
        assert_eq!(store.pending_len(), 0);
        assert_eq!(store.revision().unwrap(), 1);
    }

    #[test]
    fn memory_commit_of_empty_pending_clears_list() {
        let mut store = InMemoryStore::with_entries(vec![1, 2]);
        store.commit_pending_list().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn memory_clear_pending() {
        let mut store = InMemoryStore::with_entries(vec![1]);
        store.append_to_pending_list(2).unwrap();
        store.clear_pending_list().unwrap();
        store.commit_pending_list().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn reader_keeps_old_snapshot_across_commit() {
        let mut store = InMemoryStore::with_entries(vec![1, 2]);
        let reader = store.reader();
        let before = reader.snapshot();

        store.append_to_pending_list(3).unwrap();
        store.commit_pending_list().unwrap();

        assert_eq!(before.as_slice(), &[1, 2]);
        assert_eq!(reader.snapshot().as_slice(), &[3]);
        assert_eq!(reader.revision(), 1);
    }

    #[test]
    fn replace_committed_bumps_revision() {
        let store = InMemoryStore::with_entries(vec![1]);
        store.replace_committed(vec![4, 5]);
        assert_eq!(store.revision().unwrap(), 1);
        assert_eq!(store.len(), 2);
    }
}
