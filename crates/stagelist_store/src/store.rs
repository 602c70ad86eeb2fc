//! Entry store trait definition.

use crate::error::StoreResult;

/// The delegate that owns the committed list of a list-valued attribute.
///
/// A store holds two lists: the **committed** list, which readers see, and a
/// **pending** list that is built up one entry at a time and then swapped in
/// by [`commit_pending_list`](EntryStore::commit_pending_list).
///
/// # Invariants
///
/// - `entry_at(i)` returns `Ok(None)` for every `i >= len`
/// - The pending list is never visible through `entry_at`
/// - `commit_pending_list` replaces the committed list in one step; a
///   concurrent reader sees the old list or the new one, never a mix
/// - `revision` changes whenever the committed list changes
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent lists
pub trait EntryStore<T>: Send {
    /// Returns a copy of the committed entry at `index`.
    ///
    /// Returns `Ok(None)` once `index` is past the end of the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn entry_at(&self, index: usize) -> StoreResult<Option<T>>;

    /// Returns the revision of the committed list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn revision(&self) -> StoreResult<u64>;

    /// Appends an entry to the pending list.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be staged.
    fn append_to_pending_list(&mut self, entry: T) -> StoreResult<()>;

    /// Atomically replaces the committed list with the pending list.
    ///
    /// The pending list is empty again after a successful commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the swap fails. The committed list is
    /// unchanged in that case.
    fn commit_pending_list(&mut self) -> StoreResult<()>;

    /// Drops everything in the pending list.
    ///
    /// # Errors
    ///
    /// Returns an error if the pending list cannot be cleared.
    fn clear_pending_list(&mut self) -> StoreResult<()>;
}
