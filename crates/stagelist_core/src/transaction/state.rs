//! Transaction state.

use crate::scan::Snapshot;
use crate::transaction::overlay::PendingOverlay;
use crate::types::{Entry, SessionId, TransactionId};

/// State of a transaction coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction; nothing is staged.
    Idle,
    /// A transaction is open and accepting staged operations.
    Staging,
    /// The staged operations passed validation and await commit.
    Precommitting,
    /// The merged list replaced the committed list.
    Committed,
    /// The transaction ended without touching the committed list.
    Aborted,
}

impl TransactionState {
    /// Returns true while a transaction holds the entity.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Staging | Self::Precommitting)
    }
}

/// Merged list produced by a successful precommit.
#[derive(Debug, Clone)]
pub(crate) struct Prepared<P> {
    pub(crate) entries: Vec<Entry<P>>,
    /// Store revision the merge was computed against.
    pub(crate) revision: u64,
}

/// An in-flight staging transaction.
///
/// Staged operations are validated against `snapshot`, the committed list as
/// it was when the transaction opened. Nothing here is visible to readers of
/// the store until commit.
#[derive(Debug)]
pub struct Transaction<P> {
    id: TransactionId,
    owner: Option<SessionId>,
    pub(crate) state: TransactionState,
    pub(crate) snapshot: Snapshot<P>,
    pub(crate) overlay: PendingOverlay<P>,
    pub(crate) prepared: Option<Prepared<P>>,
}

impl<P> Transaction<P> {
    pub(crate) fn new(id: TransactionId, owner: Option<SessionId>, snapshot: Snapshot<P>) -> Self {
        Self {
            id,
            owner,
            state: TransactionState::Staging,
            snapshot,
            overlay: PendingOverlay::new(),
            prepared: None,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the session that opened the transaction with `begin()`.
    ///
    /// `None` for transactions opened implicitly by a staging operation.
    #[must_use]
    pub fn owner(&self) -> Option<SessionId> {
        self.owner
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns the committed snapshot staging is validated against.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot<P> {
        &self.snapshot
    }

    /// Returns the staged operations.
    #[must_use]
    pub fn overlay(&self) -> &PendingOverlay<P> {
        &self.overlay
    }

    /// Returns the merged list once precommit has succeeded.
    #[must_use]
    pub fn prepared_entries(&self) -> Option<&[Entry<P>]> {
        self.prepared.as_ref().map(|p| p.entries.as_slice())
    }

    /// Drops staged work and marks the transaction aborted.
    pub(crate) fn mark_aborted(&mut self) {
        self.overlay.clear_pending();
        self.prepared = None;
        self.state = TransactionState::Aborted;
    }

    /// Drops staged work and marks the transaction committed.
    pub(crate) fn mark_committed(&mut self) {
        self.overlay.clear_pending();
        self.prepared = None;
        self.state = TransactionState::Committed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_entry, Colour, PaletteRules};

    fn create_txn() -> Transaction<Colour> {
        Transaction::new(TransactionId::new(1), None, Snapshot::from_entries(vec![], 0))
    }

    #[test]
    fn new_transaction_is_staging() {
        let txn = create_txn();
        assert_eq!(txn.state(), TransactionState::Staging);
        assert!(txn.state().is_open());
        assert!(txn.overlay().is_empty());
        assert!(txn.prepared_entries().is_none());
    }

    #[test]
    fn abort_clears_overlay() {
        let mut txn = create_txn();
        let rules = PaletteRules::new(2).with_limit(Colour::Red, 2);
        txn.overlay
            .append_pending(&txn.snapshot, &rules, false, new_entry(Colour::Red))
            .unwrap();

        txn.mark_aborted();
        assert_eq!(txn.state(), TransactionState::Aborted);
        assert!(!txn.state().is_open());
        assert!(txn.overlay().is_empty());
    }

    #[test]
    fn commit_clears_overlay() {
        let mut txn = create_txn();
        txn.prepared = Some(Prepared {
            entries: vec![],
            revision: 0,
        });

        txn.mark_committed();
        assert_eq!(txn.state(), TransactionState::Committed);
        assert!(txn.prepared_entries().is_none());
    }
}
