//! Misbehaving store delegates.

use stagelist_core::{EngineConfig, Status, TransactionCoordinator, TransactionState, TxnError};
use stagelist_testkit::prelude::*;

fn rules() -> TaggedRules {
    TaggedRules::new(4).with_limit("a", 4)
}

#[test]
fn unreachable_store_is_invalid_in_state() {
    let mut coordinator = TransactionCoordinator::new(UnreachableStore, rules(), EngineConfig::default());

    let result = coordinator.append(tagged("a", 1));
    assert_eq!(Status::from_result(&result), Status::InvalidInState);
    assert_eq!(coordinator.state(), TransactionState::Idle);

    let result = coordinator.commit();
    assert_eq!(Status::from_result(&result), Status::InvalidInState);
}

#[test]
fn runaway_store_scan_is_bounded() {
    let store = RunawayStore::new(committed(1, "a", false));
    let mut coordinator = TransactionCoordinator::new(store, rules(), EngineConfig::default());

    let err = coordinator.append(tagged("a", 1)).unwrap_err();
    assert!(matches!(err, TxnError::ScanOverrun { limit: 4 }));
    assert_eq!(err.status(), Status::InvalidInState);
    assert_eq!(coordinator.store().reads(), 5);
}

#[test]
fn store_shifting_mid_scan_aborts_commit() {
    let original = vec![committed(1, "a", false), committed(2, "a", false)];
    // Opening reads three indices; the precommit scan shifts on its second read.
    let store = ShiftingStore::new(original.clone(), 5);
    let mut coordinator = TransactionCoordinator::new(store, rules(), EngineConfig::default());

    coordinator.append(tagged("a", 3)).unwrap();
    let err = coordinator.commit().unwrap_err();

    assert!(matches!(err, TxnError::ScanUnstable { before: 0, after: 1 }));
    assert_eq!(coordinator.state(), TransactionState::Idle);
    assert_eq!(coordinator.store().stored(), original);
}

#[test]
fn failed_store_commit_clears_pending_list() {
    let original = vec![committed(1, "a", false)];
    let store = FailingCommitStore::new(original.clone());
    let mut coordinator = TransactionCoordinator::new(store, rules(), EngineConfig::default());

    coordinator.append(tagged("a", 2)).unwrap();
    coordinator.delete(&handle(1)).unwrap();
    let result = coordinator.commit();

    assert_eq!(Status::from_result(&result), Status::InvalidInState);
    assert_eq!(coordinator.state(), TransactionState::Idle);
    assert_eq!(
        coordinator.last_outcome().map(|(_, state)| state),
        Some(TransactionState::Aborted)
    );

    let store = coordinator.store();
    assert_eq!(store.clears(), 1);
    assert_eq!(store.pending_len(), 0);
    assert_eq!(store.stored(), original);
}

#[test]
fn corrupt_committed_entry_cannot_be_edited() {
    let store = MissingBuiltInStore::new(vec![committed(1, "a", false), committed(2, "a", false)], 0);
    let mut coordinator = TransactionCoordinator::new(store, rules(), EngineConfig::default());

    coordinator.delete(&handle(2)).unwrap();
    let result = coordinator.append(tagged("a", 5).with_handle(handle(1)));

    assert_eq!(Status::from_result(&result), Status::InvalidInState);
    assert!(coordinator.transaction().is_none());
}

#[test]
fn repeated_committed_handle_fails_precommit() {
    let original = vec![committed(1, "a", false), committed(1, "a", false), committed(2, "a", false)];
    let mut coordinator = coordinator(original.clone(), rules(), EngineConfig::default());

    assert_eq!(Status::from_result(&coordinator.delete(&handle(1))), Status::Success);
    let err = coordinator.commit().unwrap_err();

    assert!(matches!(err, TxnError::CorruptEntry { .. }));
    assert_eq!(err.status(), Status::InvalidInState);
    assert_eq!(coordinator.state(), TransactionState::Idle);
    assert_eq!(*coordinator.store().snapshot(), original);
}
