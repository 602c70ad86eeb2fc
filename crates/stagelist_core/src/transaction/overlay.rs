//! Pending overlay of staged list changes.

use crate::error::TxnResult;
use crate::rules::EntryRules;
use crate::scan::Snapshot;
use crate::types::{Entry, Handle};
use crate::validator::Validator;
use std::collections::{BTreeSet, HashMap};

/// A staged addition or edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite<P> {
    /// A new entry, appended after the committed entries on commit.
    Add(Entry<P>),
    /// A replacement for the committed entry with the same handle.
    Edit(Entry<P>),
}

impl<P> PendingWrite<P> {
    /// Returns the staged entry.
    #[must_use]
    pub fn entry(&self) -> &Entry<P> {
        match self {
            Self::Add(entry) | Self::Edit(entry) => entry,
        }
    }

    /// Returns the handle of the staged entry, if it has one.
    #[must_use]
    pub fn handle(&self) -> Option<&Handle> {
        self.entry().handle.as_ref()
    }

    /// Consumes the write and returns the staged entry.
    #[must_use]
    pub fn into_entry(self) -> Entry<P> {
        match self {
            Self::Add(entry) | Self::Edit(entry) => entry,
        }
    }
}

/// What a staged delete removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    /// A committed entry; the delete is recorded in the overlay.
    Committed,
    /// The staged add at this position; the add is simply dropped.
    PendingAdd(usize),
}

/// Staged adds, edits and deletes for one in-flight transaction.
///
/// Every operation passes through a [`Validator`] before it is recorded, and
/// a rejected operation leaves the overlay exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOverlay<P> {
    /// Adds and edits in staging order.
    writes: Vec<PendingWrite<P>>,
    /// Handles of committed entries staged for deletion.
    deletes: BTreeSet<Handle>,
}

impl<P> Default for PendingOverlay<P> {
    fn default() -> Self {
        Self {
            writes: Vec::new(),
            deletes: BTreeSet::new(),
        }
    }
}

impl<P> PendingOverlay<P> {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }

    /// Returns the number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len() + self.deletes.len()
    }

    /// Returns the staged adds and edits in staging order.
    #[must_use]
    pub fn writes(&self) -> &[PendingWrite<P>] {
        &self.writes
    }

    /// Returns the staged adds in staging order.
    pub fn adds(&self) -> impl Iterator<Item = &Entry<P>> {
        self.writes.iter().filter_map(|write| match write {
            PendingWrite::Add(entry) => Some(entry),
            PendingWrite::Edit(_) => None,
        })
    }

    /// Returns the handles staged for deletion.
    pub fn deletes(&self) -> impl Iterator<Item = &Handle> {
        self.deletes.iter()
    }

    /// Returns true if any staged operation targets `handle`.
    #[must_use]
    pub fn references(&self, handle: &Handle) -> bool {
        self.deletes.contains(handle) || self.writes.iter().any(|w| w.handle() == Some(handle))
    }

    /// Returns the position of the staged add carrying `handle`.
    #[must_use]
    pub fn add_position(&self, handle: &Handle) -> Option<usize> {
        self.writes
            .iter()
            .position(|w| matches!(w, PendingWrite::Add(e) if e.handle.as_ref() == Some(handle)))
    }

    /// Returns the staged edit of `handle`.
    #[must_use]
    pub fn edited(&self, handle: &Handle) -> Option<&Entry<P>> {
        self.writes.iter().find_map(|write| match write {
            PendingWrite::Edit(entry) if entry.handle.as_ref() == Some(handle) => Some(entry),
            _ => None,
        })
    }

    /// Returns true if `handle` is staged for deletion.
    #[must_use]
    pub fn is_deleted(&self, handle: &Handle) -> bool {
        self.deletes.contains(handle)
    }

    /// Stages an add or an edit.
    ///
    /// A null handle stages a new entry, which is given a fresh handle when
    /// `assign_handles` is set. A non-null handle stages an edit of the
    /// committed entry with that handle.
    ///
    /// Returns the handle the staged entry carries.
    ///
    /// # Errors
    ///
    /// Any rejection from the [`Validator`]; the overlay is unchanged.
    pub fn append_pending<R>(
        &mut self,
        committed: &Snapshot<P>,
        rules: &R,
        assign_handles: bool,
        entry: Entry<P>,
    ) -> TxnResult<Option<Handle>>
    where
        R: EntryRules<P>,
    {
        let write = {
            let validator = Validator::new(committed, self, rules);
            let mut write = validator.resolve_write(entry)?;
            if let PendingWrite::Add(entry) = &mut write {
                if assign_handles {
                    entry.handle = Some(Handle::generate());
                }
            }
            validator.check_entry(&write)?;
            validator.check_quota(&write)?;
            write
        };

        let handle = write.handle().cloned();
        self.writes.push(write);
        Ok(handle)
    }

    /// Stages a delete.
    ///
    /// Deleting a handle that belongs to a staged add cancels that add.
    ///
    /// # Errors
    ///
    /// Any rejection from the [`Validator`]; the overlay is unchanged.
    pub fn remove_pending<R>(
        &mut self,
        committed: &Snapshot<P>,
        rules: &R,
        handle: &Handle,
    ) -> TxnResult<()>
    where
        R: EntryRules<P>,
    {
        let target = Validator::new(committed, self, rules).resolve_delete(handle)?;
        match target {
            DeleteTarget::PendingAdd(position) => {
                self.writes.remove(position);
            }
            DeleteTarget::Committed => {
                self.deletes.insert(handle.clone());
            }
        }
        Ok(())
    }

    /// Drops every staged operation.
    pub fn clear_pending(&mut self) {
        self.writes.clear();
        self.deletes.clear();
    }

    /// Re-validates every staged operation against a newer snapshot.
    ///
    /// Deletes are replayed first, then adds and edits in staging order.
    /// Quotas are not checked here; they apply to the merged list as a whole.
    ///
    /// # Errors
    ///
    /// The first rejection from the [`Validator`].
    pub fn rebase<R>(&self, committed: &Snapshot<P>, rules: &R) -> TxnResult<Self>
    where
        P: Clone,
        R: EntryRules<P>,
    {
        let mut rebased = Self::new();

        for handle in &self.deletes {
            let target = Validator::new(committed, &rebased, rules).resolve_delete(handle)?;
            match target {
                DeleteTarget::Committed => {
                    rebased.deletes.insert(handle.clone());
                }
                DeleteTarget::PendingAdd(position) => {
                    rebased.writes.remove(position);
                }
            }
        }

        for write in &self.writes {
            let checked = {
                let validator = Validator::new(committed, &rebased, rules);
                let checked = match write {
                    PendingWrite::Add(entry) => validator.resolve_add(entry.clone())?,
                    PendingWrite::Edit(entry) => validator.resolve_write(entry.clone())?,
                };
                validator.check_entry(&checked)?;
                checked
            };
            rebased.writes.push(checked);
        }

        Ok(rebased)
    }

    /// Applies the overlay to a committed snapshot.
    ///
    /// Committed entries keep their order; edited ones are replaced in
    /// place and deleted ones dropped. Staged adds follow in staging order.
    #[must_use]
    pub fn merge(self, committed: Snapshot<P>) -> Vec<Entry<P>> {
        let mut edits: HashMap<Handle, Entry<P>> = HashMap::new();
        let mut adds = Vec::new();
        for write in self.writes {
            match write {
                PendingWrite::Edit(entry) => {
                    if let Some(handle) = entry.handle.clone() {
                        edits.insert(handle, entry);
                    }
                }
                PendingWrite::Add(entry) => adds.push(entry),
            }
        }

        let mut merged = Vec::with_capacity(committed.len() + adds.len());
        for entry in committed.into_entries() {
            match entry.handle.as_ref() {
                Some(handle) if self.deletes.contains(handle) => {}
                Some(handle) => match edits.remove(handle) {
                    Some(edited) => merged.push(edited),
                    None => merged.push(entry),
                },
                None => merged.push(entry),
            }
        }
        merged.extend(adds);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TxnError;
    use crate::test_support::{committed, new_entry, Colour, PaletteRules};

    fn rules() -> PaletteRules {
        PaletteRules::new(3).with_limit(Colour::Red, 2).with_limit(Colour::Blue, 3)
    }

    fn handle(byte: u8) -> Handle {
        Handle::from_bytes(vec![byte])
    }

    #[test]
    fn append_new_entry() {
        let snapshot = Snapshot::from_entries(vec![], 0);
        let mut overlay = PendingOverlay::new();

        let assigned = overlay
            .append_pending(&snapshot, &rules(), false, new_entry(Colour::Red))
            .unwrap();

        assert_eq!(assigned, None);
        assert_eq!(overlay.len(), 1);
        assert_eq!(overlay.adds().count(), 1);
    }

    #[test]
    fn append_assigns_handle_when_configured() {
        let snapshot = Snapshot::from_entries(vec![], 0);
        let mut overlay = PendingOverlay::new();

        let assigned = overlay
            .append_pending(&snapshot, &rules(), true, new_entry(Colour::Red))
            .unwrap()
            .unwrap();

        assert_eq!(overlay.add_position(&assigned), Some(0));
    }

    #[test]
    fn rejected_append_leaves_overlay_untouched() {
        let snapshot = Snapshot::from_entries(
            vec![
                committed(1, Colour::Red, Some(false)),
                committed(2, Colour::Red, Some(false)),
            ],
            0,
        );
        let mut overlay = PendingOverlay::new();
        overlay
            .append_pending(&snapshot, &rules(), false, new_entry(Colour::Blue))
            .unwrap();
        let before = overlay.clone();

        let err = overlay
            .append_pending(&snapshot, &rules(), false, new_entry(Colour::Red))
            .unwrap_err();

        assert!(matches!(err, TxnError::EntryLimitExceeded { .. }));
        assert_eq!(overlay, before);
    }

    #[test]
    fn second_operation_on_handle_is_rejected() {
        let snapshot = Snapshot::from_entries(vec![committed(1, Colour::Red, Some(false))], 0);
        let mut overlay = PendingOverlay::new();
        overlay
            .append_pending(&snapshot, &rules(), false, committed(1, Colour::Blue, None))
            .unwrap();

        let edit_again = overlay.append_pending(&snapshot, &rules(), false, committed(1, Colour::Red, None));
        assert!(matches!(edit_again, Err(TxnError::ConstraintViolation { .. })));

        let delete = overlay.remove_pending(&snapshot, &rules(), &handle(1));
        assert!(matches!(delete, Err(TxnError::ConstraintViolation { .. })));

        assert_eq!(overlay.edited(&handle(1)).unwrap().payload, Colour::Blue);
    }

    #[test]
    fn delete_cancels_staged_add() {
        let snapshot = Snapshot::from_entries(vec![], 0);
        let mut overlay = PendingOverlay::new();
        let assigned = overlay
            .append_pending(&snapshot, &rules(), true, new_entry(Colour::Red))
            .unwrap()
            .unwrap();

        overlay.remove_pending(&snapshot, &rules(), &assigned).unwrap();
        assert!(overlay.is_empty());

        let again = overlay.remove_pending(&snapshot, &rules(), &assigned);
        assert!(matches!(again, Err(TxnError::HandleNotFound { .. })));
    }

    #[test]
    fn clear_pending_drops_everything() {
        let snapshot = Snapshot::from_entries(vec![committed(1, Colour::Red, Some(false))], 0);
        let mut overlay = PendingOverlay::new();
        overlay.remove_pending(&snapshot, &rules(), &handle(1)).unwrap();
        overlay
            .append_pending(&snapshot, &rules(), false, new_entry(Colour::Blue))
            .unwrap();

        overlay.clear_pending();
        assert!(overlay.is_empty());
        assert!(!overlay.is_deleted(&handle(1)));
    }

    #[test]
    fn merge_keeps_order_and_appends_adds() {
        let snapshot = Snapshot::from_entries(
            vec![
                committed(1, Colour::Red, Some(true)),
                committed(2, Colour::Red, Some(false)),
                committed(3, Colour::Blue, Some(false)),
            ],
            0,
        );
        let rules = PaletteRules::new(4).with_limit(Colour::Red, 2).with_limit(Colour::Blue, 3);
        let mut overlay = PendingOverlay::new();
        overlay.remove_pending(&snapshot, &rules, &handle(2)).unwrap();
        overlay
            .append_pending(&snapshot, &rules, false, new_entry(Colour::Blue))
            .unwrap();
        overlay
            .append_pending(&snapshot, &rules, false, committed(1, Colour::Blue, None))
            .unwrap();

        let merged = overlay.merge(snapshot);
        let summary: Vec<_> = merged
            .iter()
            .map(|e| (e.handle.clone(), e.payload, e.built_in))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some(handle(1)), Colour::Blue, Some(true)),
                (Some(handle(3)), Colour::Blue, Some(false)),
                (None, Colour::Blue, Some(false)),
            ]
        );
    }

    #[test]
    fn rebase_detects_vanished_handle() {
        let old = Snapshot::from_entries(vec![committed(1, Colour::Red, Some(false))], 0);
        let mut overlay = PendingOverlay::new();
        overlay
            .append_pending(&old, &rules(), false, committed(1, Colour::Blue, None))
            .unwrap();

        let newer = Snapshot::from_entries(vec![], 1);
        let err = overlay.rebase(&newer, &rules()).unwrap_err();
        assert!(matches!(err, TxnError::HandleNotFound { .. }));
    }

    #[test]
    fn rebase_keeps_assigned_handles() {
        let snapshot = Snapshot::from_entries(vec![], 0);
        let mut overlay = PendingOverlay::new();
        let assigned = overlay
            .append_pending(&snapshot, &rules(), true, new_entry(Colour::Red))
            .unwrap()
            .unwrap();

        let rebased = overlay.rebase(&snapshot, &rules()).unwrap();
        assert_eq!(rebased, overlay);
        assert_eq!(rebased.add_position(&assigned), Some(0));
    }
}
