//! Staged operation validation.

use crate::error::{TxnError, TxnResult};
use crate::rules::EntryRules;
use crate::scan::Snapshot;
use crate::transaction::{DeleteTarget, PendingOverlay, PendingWrite};
use crate::types::{Entry, Handle};
use std::collections::HashMap;

/// Stateless rule checker over a committed snapshot and a pending overlay.
///
/// A validator never mutates anything. It answers questions about the list
/// that would exist if the overlay were committed right now, and decides
/// whether one more staged operation may join the overlay.
///
/// Conflicting operations are never merged: once a handle is referenced by
/// a staged operation, any further operation on that handle in the same
/// transaction is a constraint error.
pub struct Validator<'a, P, R> {
    committed: &'a Snapshot<P>,
    overlay: &'a PendingOverlay<P>,
    rules: &'a R,
}

impl<'a, P, R> Validator<'a, P, R>
where
    R: EntryRules<P>,
{
    /// Creates a validator over a snapshot pair.
    pub fn new(committed: &'a Snapshot<P>, overlay: &'a PendingOverlay<P>, rules: &'a R) -> Self {
        Self {
            committed,
            overlay,
            rules,
        }
    }

    /// Finds the committed entry with `handle`.
    #[must_use]
    pub fn matching_committed_entry(&self, handle: &Handle) -> Option<&'a Entry<P>> {
        self.committed.find(handle)
    }

    /// Number of entries the list would hold after commit.
    #[must_use]
    pub fn projected_total(&self) -> usize {
        self.surviving_committed().count() + self.overlay.writes().len()
    }

    /// Number of entries in `category` the list would hold after commit.
    ///
    /// Committed entries in the category, minus staged deletes and edits
    /// that move entries out of it, plus staged adds and edits landing in it.
    #[must_use]
    pub fn projected_count(&self, category: &R::Category) -> usize {
        let committed = self
            .surviving_committed()
            .filter(|entry| &self.rules.category_of(entry) == category)
            .count();
        let staged = self
            .overlay
            .writes()
            .iter()
            .filter(|write| &self.rules.category_of(write.entry()) == category)
            .count();
        committed + staged
    }

    /// Committed entries that no staged edit or delete touches.
    fn surviving_committed(&self) -> impl Iterator<Item = &'a Entry<P>> + '_ {
        self.committed.entries().iter().filter(move |entry| {
            entry
                .handle
                .as_ref()
                .map_or(true, |handle| !self.overlay.references(handle))
        })
    }

    /// Resolves a client-supplied entry into a staged write.
    ///
    /// A null handle makes the entry a new addition; anything else edits the
    /// committed entry with that handle.
    ///
    /// # Errors
    ///
    /// See [`resolve_add`](Self::resolve_add) and
    /// [`resolve_edit`](Self::resolve_edit).
    pub fn resolve_write(&self, entry: Entry<P>) -> TxnResult<PendingWrite<P>> {
        match entry.handle.clone() {
            None => self.resolve_add(entry),
            Some(handle) => self.resolve_edit(&handle, entry),
        }
    }

    /// Resolves a new entry.
    ///
    /// New entries may never claim to be built-in; an unset flag becomes
    /// `false`.
    ///
    /// # Errors
    ///
    /// Returns a constraint violation if the entry claims `built_in = true`.
    pub fn resolve_add(&self, mut entry: Entry<P>) -> TxnResult<PendingWrite<P>> {
        if entry.built_in == Some(true) {
            return Err(TxnError::constraint("new entries cannot be built-in"));
        }
        entry.built_in = Some(false);
        Ok(PendingWrite::Add(entry))
    }

    /// Resolves an edit of the committed entry with `handle`.
    ///
    /// An unset built-in flag adopts the committed entry's value.
    ///
    /// # Errors
    ///
    /// - `HandleNotFound` if no committed entry has `handle`
    /// - `ConstraintViolation` if another staged operation already targets
    ///   `handle`, or the built-in flag differs from the committed one
    /// - `CorruptEntry` if the committed entry has no built-in flag
    pub fn resolve_edit(&self, handle: &Handle, mut entry: Entry<P>) -> TxnResult<PendingWrite<P>> {
        let matching = self
            .matching_committed_entry(handle)
            .ok_or_else(|| TxnError::not_found(handle))?;

        if self.overlay.references(handle) {
            return Err(TxnError::constraint(format!(
                "handle {handle} already has a staged operation"
            )));
        }

        let committed_built_in = matching.built_in.ok_or_else(|| {
            TxnError::corrupt(format!("committed entry {handle} has no built-in flag"))
        })?;

        match entry.built_in {
            None => entry.built_in = Some(committed_built_in),
            Some(built_in) if built_in != committed_built_in => {
                return Err(TxnError::constraint(format!(
                    "built-in flag of {handle} cannot change"
                )));
            }
            Some(_) => {}
        }

        entry.handle = Some(handle.clone());
        Ok(PendingWrite::Edit(entry))
    }

    /// Decides what a staged delete of `handle` means.
    ///
    /// # Errors
    ///
    /// - `HandleNotFound` if neither the committed list nor the staged adds
    ///   carry `handle`
    /// - `ConstraintViolation` if the entry is built-in or already has a
    ///   staged operation
    /// - `CorruptEntry` if the committed entry has no built-in flag
    pub fn resolve_delete(&self, handle: &Handle) -> TxnResult<DeleteTarget> {
        if let Some(position) = self.overlay.add_position(handle) {
            return Ok(DeleteTarget::PendingAdd(position));
        }

        let matching = self
            .matching_committed_entry(handle)
            .ok_or_else(|| TxnError::not_found(handle))?;

        match matching.built_in {
            None => {
                return Err(TxnError::corrupt(format!(
                    "committed entry {handle} has no built-in flag"
                )));
            }
            Some(true) => {
                return Err(TxnError::constraint(format!(
                    "built-in entry {handle} cannot be deleted"
                )));
            }
            Some(false) => {}
        }

        if self.overlay.references(handle) {
            return Err(TxnError::constraint(format!(
                "handle {handle} already has a staged operation"
            )));
        }

        Ok(DeleteTarget::Committed)
    }

    /// Runs the attribute's per-entry rules against a staged write.
    ///
    /// # Errors
    ///
    /// Returns a constraint violation if the entry's category is not
    /// supported or the rules reject the payload.
    pub fn check_entry(&self, write: &PendingWrite<P>) -> TxnResult<()> {
        let category = self.rules.category_of(write.entry());
        if self.rules.max_per_category(&category) == 0 {
            return Err(TxnError::constraint(format!(
                "category {category:?} is not supported"
            )));
        }
        self.rules.check_entry(write.entry())
    }

    /// Checks that the list stays within its quotas if `write` is staged.
    ///
    /// The overlay is not modified; counts are projected as though the
    /// write had already joined it.
    ///
    /// # Errors
    ///
    /// Returns `EntryLimitExceeded` or `CategoryLimitExceeded`.
    pub fn check_quota(&self, write: &PendingWrite<P>) -> TxnResult<()> {
        let category = self.rules.category_of(write.entry());

        let (total, count) = match write {
            PendingWrite::Add(_) => (
                self.projected_total() + 1,
                self.projected_count(&category) + 1,
            ),
            PendingWrite::Edit(entry) => {
                let replaced = entry
                    .handle
                    .as_ref()
                    .and_then(|handle| self.matching_committed_entry(handle))
                    .filter(|old| self.rules.category_of(old) == category)
                    .map_or(0, |_| 1);
                (
                    self.projected_total(),
                    self.projected_count(&category) + 1 - replaced,
                )
            }
        };

        let max_entries = self.rules.max_entries();
        if total > max_entries {
            return Err(TxnError::EntryLimitExceeded {
                count: total,
                limit: max_entries,
            });
        }

        let max_in_category = self.rules.max_per_category(&category);
        if count > max_in_category {
            return Err(TxnError::CategoryLimitExceeded {
                category: format!("{category:?}"),
                count,
                limit: max_in_category,
            });
        }

        Ok(())
    }

    /// Checks a complete list against the quotas of `rules`.
    ///
    /// # Errors
    ///
    /// Returns a constraint violation if an entry belongs to an unsupported
    /// category, otherwise `EntryLimitExceeded` or `CategoryLimitExceeded`.
    pub fn check_list(entries: &[Entry<P>], rules: &R) -> TxnResult<()> {
        if entries.len() > rules.max_entries() {
            return Err(TxnError::EntryLimitExceeded {
                count: entries.len(),
                limit: rules.max_entries(),
            });
        }

        let mut counts: HashMap<R::Category, usize> = HashMap::new();
        for entry in entries {
            *counts.entry(rules.category_of(entry)).or_insert(0) += 1;
        }

        for (category, count) in counts {
            let limit = rules.max_per_category(&category);
            if limit == 0 {
                return Err(TxnError::constraint(format!(
                    "category {category:?} is not supported"
                )));
            }
            if count > limit {
                return Err(TxnError::CategoryLimitExceeded {
                    category: format!("{category:?}"),
                    count,
                    limit,
                });
            }
        }

        Ok(())
    }
}
