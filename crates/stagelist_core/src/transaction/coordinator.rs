//! Transaction coordinator.

use crate::config::EngineConfig;
use crate::error::{TxnError, TxnResult};
use crate::rules::EntryRules;
use crate::scan::Snapshot;
use crate::transaction::state::{Prepared, Transaction, TransactionState};
use crate::types::{Entry, EntryChanges, Handle, SessionId, TransactionId};
use crate::validator::Validator;
use stagelist_store::EntryStore;
use tracing::{debug, error, info, warn};

/// Drives staging, precommit and commit for one managed entity.
///
/// The coordinator owns its entity's store and holds at most one
/// transaction at a time. It is not internally synchronized: all steps for
/// one entity run on one logical context, and independent entities get
/// independent coordinators (see [`CoordinatorRegistry`]).
///
/// ## Lifecycle
///
/// ```text
/// Idle --append/edit/delete/begin--> Staging --precommit--> Precommitting
///                                       |                        |
///                                       +-------commit-----------+--> Committed -> Idle
///                                       |                        |
///                                       +--discard / failure-----+--> Aborted   -> Idle
/// ```
///
/// A rejected Append/Edit/Delete drops only that operation unless the
/// rejection reports `InvalidInState`, in which case the whole transaction
/// is aborted. Any failure during precommit or commit aborts the whole
/// transaction and the committed list is left untouched.
///
/// [`CoordinatorRegistry`]: crate::CoordinatorRegistry
#[derive(Debug)]
pub struct TransactionCoordinator<P, R, S> {
    store: S,
    rules: R,
    config: EngineConfig,
    active: Option<Transaction<P>>,
    next_txid: u64,
    last_outcome: Option<(TransactionId, TransactionState)>,
}

impl<P, R, S> TransactionCoordinator<P, R, S>
where
    P: Clone,
    R: EntryRules<P>,
    S: EntryStore<Entry<P>>,
{
    /// Creates an idle coordinator over `store`.
    pub fn new(store: S, rules: R, config: EngineConfig) -> Self {
        Self {
            store,
            rules,
            config,
            active: None,
            next_txid: 1,
            last_outcome: None,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.active
            .as_ref()
            .map_or(TransactionState::Idle, Transaction::state)
    }

    /// Returns the in-flight transaction, if any.
    #[must_use]
    pub fn transaction(&self) -> Option<&Transaction<P>> {
        self.active.as_ref()
    }

    /// Returns how the most recent transaction ended.
    #[must_use]
    pub fn last_outcome(&self) -> Option<(TransactionId, TransactionState)> {
        self.last_outcome
    }

    /// Returns the attribute rules.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the entry store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the committed list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned.
    pub fn committed_entries(&self) -> TxnResult<Vec<Entry<P>>> {
        Snapshot::capture(&self.store, self.rules.max_entries()).map(Snapshot::into_entries)
    }

    /// Opens a transaction on behalf of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `TransactionInProgress` if a transaction is already open, or
    /// an error if the committed list cannot be scanned.
    pub fn begin(&mut self, owner: SessionId) -> TxnResult<TransactionId> {
        if let Some(txn) = &self.active {
            warn!(txn = %txn.id(), %owner, "rejected second transaction start");
            return Err(TxnError::TransactionInProgress { id: txn.id() });
        }
        self.open(Some(owner))
    }

    /// Stages a new entry, or an edit when `entry` carries a handle.
    ///
    /// Returns the handle the staged entry will carry once committed.
    ///
    /// # Errors
    ///
    /// The rejection for this operation. Errors reporting `InvalidInState`
    /// also abort the transaction.
    pub fn append(&mut self, entry: Entry<P>) -> TxnResult<Option<Handle>> {
        self.stage("append", |txn, rules, config| {
            txn.overlay
                .append_pending(&txn.snapshot, rules, config.assign_handles, entry)
        })
    }

    /// Stages a replacement for the committed entry with `handle`.
    ///
    /// # Errors
    ///
    /// As for [`append`](Self::append).
    pub fn edit(&mut self, handle: &Handle, changes: EntryChanges<P>) -> TxnResult<()> {
        let entry = changes.into_entry(handle.clone());
        self.stage("edit", |txn, rules, _| {
            txn.overlay
                .append_pending(&txn.snapshot, rules, false, entry)
                .map(|_| ())
        })
    }

    /// Stages removal of the entry with `handle`.
    ///
    /// # Errors
    ///
    /// As for [`append`](Self::append).
    pub fn delete(&mut self, handle: &Handle) -> TxnResult<()> {
        self.stage("delete", |txn, rules, _| {
            txn.overlay.remove_pending(&txn.snapshot, rules, handle)
        })
    }

    /// Validates the transaction against a fresh scan of the committed list
    /// and builds the merged list.
    ///
    /// Calling it again while already precommitting is a no-op.
    ///
    /// # Errors
    ///
    /// `NoTransaction` when idle. Any other error aborts the transaction.
    pub fn precommit(&mut self) -> TxnResult<()> {
        match self.state() {
            TransactionState::Staging => self.prepare(),
            TransactionState::Precommitting => Ok(()),
            _ => Err(TxnError::NoTransaction),
        }
    }

    /// Replaces the committed list with the merged list.
    ///
    /// Runs [`precommit`](Self::precommit) first if it has not run yet.
    ///
    /// # Errors
    ///
    /// `NoTransaction` when idle. Any other error aborts the transaction and
    /// leaves the committed list as it was.
    pub fn commit(&mut self) -> TxnResult<()> {
        if self.state() == TransactionState::Staging {
            self.prepare()?;
        }

        let (id, prepared) = match self.active.as_mut() {
            Some(txn) => (txn.id(), txn.prepared.take()),
            None => return Err(TxnError::NoTransaction),
        };
        let Some(prepared) = prepared else {
            let err = TxnError::invalid_operation(format!("{id} has no merged list"));
            self.abort(&err);
            return Err(err);
        };

        match Self::write_through(&mut self.store, prepared) {
            Ok(count) => {
                if let Some(mut txn) = self.active.take() {
                    txn.mark_committed();
                }
                self.last_outcome = Some((id, TransactionState::Committed));
                info!(txn = %id, entries = count, "transaction committed");
                Ok(())
            }
            Err(err) => {
                self.abort(&err);
                Err(err)
            }
        }
    }

    /// Drops the in-flight transaction, if any.
    pub fn discard(&mut self) {
        if let Some(mut txn) = self.active.take() {
            let staged = txn.overlay.len();
            txn.mark_aborted();
            self.last_outcome = Some((txn.id(), TransactionState::Aborted));
            debug!(txn = %txn.id(), staged, "transaction discarded");
        }
    }

    /// Discards the transaction if `owner` opened it.
    ///
    /// Returns true if a transaction was dropped.
    pub fn end_session(&mut self, owner: SessionId) -> bool {
        let owned = self
            .active
            .as_ref()
            .is_some_and(|txn| txn.owner() == Some(owner));
        if owned {
            debug!(%owner, "session ended with open transaction");
            self.discard();
        }
        owned
    }

    fn open(&mut self, owner: Option<SessionId>) -> TxnResult<TransactionId> {
        let snapshot = Snapshot::capture(&self.store, self.rules.max_entries()).map_err(|err| {
            warn!(error = %err, "cannot open transaction");
            err
        })?;

        let id = TransactionId::new(self.next_txid);
        self.next_txid += 1;
        debug!(txn = %id, committed = snapshot.len(), "transaction opened");
        self.active = Some(Transaction::new(id, owner, snapshot));
        Ok(id)
    }

    /// Makes sure a transaction is accepting operations.
    ///
    /// Returns true if a transaction was opened implicitly.
    fn ensure_staging(&mut self) -> TxnResult<bool> {
        match self.active.as_ref().map(Transaction::state) {
            None if self.config.require_begin => Err(TxnError::NoTransaction),
            None => self.open(None).map(|_| true),
            Some(TransactionState::Staging) => Ok(false),
            Some(state) => Err(TxnError::invalid_operation(format!(
                "cannot stage while {state:?}"
            ))),
        }
    }

    fn stage<T>(
        &mut self,
        op: &'static str,
        apply: impl FnOnce(&mut Transaction<P>, &R, &EngineConfig) -> TxnResult<T>,
    ) -> TxnResult<T> {
        let opened = self.ensure_staging()?;
        let Some(txn) = self.active.as_mut() else {
            return Err(TxnError::NoTransaction);
        };

        match apply(txn, &self.rules, &self.config) {
            Ok(value) => {
                debug!(txn = %txn.id(), op, staged = txn.overlay.len(), "staged operation");
                Ok(value)
            }
            Err(err) if err.is_fatal() => {
                self.abort(&err);
                Err(err)
            }
            Err(err) => {
                debug!(op, status = %err.status(), error = %err, "rejected operation");
                if opened {
                    self.active = None;
                }
                Err(err)
            }
        }
    }

    fn prepare(&mut self) -> TxnResult<()> {
        let result = match self.active.as_ref() {
            Some(txn) => Self::merge(&self.store, &self.rules, txn),
            None => return Err(TxnError::NoTransaction),
        };

        let prepared = match result {
            Ok(prepared) => prepared,
            Err(err) => {
                self.abort(&err);
                return Err(err);
            }
        };

        let Some(txn) = self.active.as_mut() else {
            return Err(TxnError::NoTransaction);
        };
        debug!(
            txn = %txn.id(),
            entries = prepared.entries.len(),
            revision = prepared.revision,
            "transaction precommitted"
        );
        txn.prepared = Some(prepared);
        txn.state = TransactionState::Precommitting;
        Ok(())
    }

    /// Re-scans the committed list and applies the overlay to it.
    fn merge(store: &S, rules: &R, txn: &Transaction<P>) -> TxnResult<Prepared<P>> {
        let snapshot = Snapshot::capture(store, rules.max_entries())?;
        snapshot.verify_integrity()?;

        let revision = snapshot.revision();
        let entries = txn.overlay.rebase(&snapshot, rules)?.merge(snapshot);
        Validator::check_list(&entries, rules)?;

        Ok(Prepared { entries, revision })
    }

    /// Pushes the merged list through the store's pending list.
    fn write_through(store: &mut S, prepared: Prepared<P>) -> TxnResult<usize> {
        let current = store.revision()?;
        if current != prepared.revision {
            return Err(TxnError::ScanUnstable {
                before: prepared.revision,
                after: current,
            });
        }

        let count = prepared.entries.len();
        let pushed = prepared
            .entries
            .into_iter()
            .try_for_each(|entry| store.append_to_pending_list(entry))
            .and_then(|()| store.commit_pending_list());

        if let Err(err) = pushed {
            if let Err(clear_err) = store.clear_pending_list() {
                error!(error = %clear_err, "failed to clear store pending list");
            }
            return Err(err.into());
        }
        Ok(count)
    }

    fn abort(&mut self, err: &TxnError) {
        let Some(mut txn) = self.active.take() else {
            return;
        };
        let staged = txn.overlay.len();
        txn.mark_aborted();
        self.last_outcome = Some((txn.id(), TransactionState::Aborted));

        if matches!(err, TxnError::CorruptEntry { .. }) {
            error!(txn = %txn.id(), staged, error = %err, "corrupt committed list, transaction aborted");
        } else {
            warn!(txn = %txn.id(), staged, status = %err.status(), error = %err, "transaction aborted");
        }
    }
}
