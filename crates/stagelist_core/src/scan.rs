//! Bounded index scans over an entry store.
//!
//! Stores expose their committed list one index at a time and signal the end
//! with an exhaustion marker. [`IndexScan`] turns that protocol into a finite
//! iterator that probes at most `limit` indices, so a store that never
//! reports exhaustion cannot keep the engine looping.

use crate::error::{TxnError, TxnResult};
use crate::types::{Entry, Handle};
use stagelist_store::EntryStore;
use std::collections::HashSet;
use std::marker::PhantomData;

/// A restartable, bounded iterator over a store's committed list.
///
/// Yields `Ok(entry)` for indices `0, 1, 2, ...` until the store reports
/// exhaustion. If `limit` indices have produced entries and the store still
/// has not reported exhaustion, the next item is
/// [`TxnError::ScanOverrun`]. A store error ends the scan.
///
/// # Example
///
/// ```rust
/// use stagelist_core::IndexScan;
/// use stagelist_store::InMemoryStore;
///
/// let store = InMemoryStore::with_entries(vec![10, 20]);
/// let entries: Vec<i32> = IndexScan::new(&store, 8)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(entries, vec![10, 20]);
/// ```
pub struct IndexScan<'a, T, S: ?Sized> {
    store: &'a S,
    index: usize,
    limit: usize,
    finished: bool,
    _entry: PhantomData<fn() -> T>,
}

impl<'a, T, S> IndexScan<'a, T, S>
where
    S: EntryStore<T> + ?Sized,
{
    /// Creates a scan that accepts at most `limit` entries.
    pub fn new(store: &'a S, limit: usize) -> Self {
        Self {
            store,
            index: 0,
            limit,
            finished: false,
            _entry: PhantomData,
        }
    }

    /// Rewinds the scan to index 0.
    pub fn restart(&mut self) {
        self.index = 0;
        self.finished = false;
    }

    /// Returns the next index that will be probed.
    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }
}

impl<T, S> Iterator for IndexScan<'_, T, S>
where
    S: EntryStore<T> + ?Sized,
{
    type Item = TxnResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.store.entry_at(self.index) {
            Ok(Some(_)) if self.index >= self.limit => {
                self.finished = true;
                Some(Err(TxnError::ScanOverrun { limit: self.limit }))
            }
            Ok(Some(entry)) => {
                self.index += 1;
                Some(Ok(entry))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err.into()))
            }
        }
    }
}

/// A stable copy of the committed list taken by a full scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<P> {
    entries: Vec<Entry<P>>,
    revision: u64,
}

impl<P> Snapshot<P> {
    /// Scans the whole committed list of `store`.
    ///
    /// At most `max_entries + 1` indices are probed. The store revision is
    /// read before and after the scan; if it moved, the entries may mix two
    /// lists and the scan is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TxnError::ScanUnstable`] if the list changed mid-scan,
    /// [`TxnError::ScanOverrun`] if the store never signalled exhaustion,
    /// or the store's own error.
    pub fn capture<S>(store: &S, max_entries: usize) -> TxnResult<Self>
    where
        S: EntryStore<Entry<P>> + ?Sized,
    {
        let before = store.revision()?;
        let entries = IndexScan::new(store, max_entries).collect::<TxnResult<Vec<_>>>()?;
        let after = store.revision()?;

        if before != after {
            return Err(TxnError::ScanUnstable { before, after });
        }

        Ok(Self {
            entries,
            revision: before,
        })
    }

    /// Creates a snapshot from entries already in hand.
    #[must_use]
    pub fn from_entries(entries: Vec<Entry<P>>, revision: u64) -> Self {
        Self { entries, revision }
    }

    /// Returns the committed entries in list order.
    #[must_use]
    pub fn entries(&self) -> &[Entry<P>] {
        &self.entries
    }

    /// Returns the store revision the snapshot was taken at.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the committed list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the committed entry carrying `handle`.
    #[must_use]
    pub fn find(&self, handle: &Handle) -> Option<&Entry<P>> {
        self.entries
            .iter()
            .find(|entry| entry.handle.as_ref() == Some(handle))
    }

    /// Checks that every committed entry carries its required fields and
    /// that no handle identifies more than one entry.
    ///
    /// # Errors
    ///
    /// Returns [`TxnError::CorruptEntry`] for the first entry without a
    /// built-in flag or whose handle repeats an earlier one.
    pub fn verify_integrity(&self) -> TxnResult<()> {
        let mut seen: HashSet<&Handle> = HashSet::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.built_in.is_none() {
                let handle = entry
                    .handle
                    .as_ref()
                    .map_or_else(|| "null".to_string(), ToString::to_string);
                return Err(TxnError::corrupt(format!(
                    "entry {index} (handle {handle}) has no built-in flag"
                )));
            }
            if let Some(handle) = entry.handle.as_ref() {
                if !seen.insert(handle) {
                    return Err(TxnError::corrupt(format!(
                        "entry {index} repeats handle {handle}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn into_entries(self) -> Vec<Entry<P>> {
        self.entries
    }
}
