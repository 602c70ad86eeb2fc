//! Per-entity coordinator registry.

use crate::error::{TxnError, TxnResult};
use crate::rules::EntryRules;
use crate::transaction::TransactionCoordinator;
use crate::types::Entry;
use parking_lot::{Mutex, RwLock};
use stagelist_store::EntryStore;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// Shared handle to one entity's coordinator.
pub type SharedCoordinator<P, R, S> = Arc<Mutex<TransactionCoordinator<P, R, S>>>;

/// Maps managed entities (e.g. endpoints) to their transaction coordinators.
///
/// Each coordinator sits behind its own mutex, so transactions on different
/// entities never contend. The registry lock is only held for lookups and
/// is released before a coordinator is locked.
///
/// Entities are registered when they come up and unregistered on teardown;
/// unregistering discards any transaction still open.
pub struct CoordinatorRegistry<K, P, R, S> {
    coordinators: RwLock<HashMap<K, SharedCoordinator<P, R, S>>>,
}

impl<K, P, R, S> Default for CoordinatorRegistry<K, P, R, S> {
    fn default() -> Self {
        Self {
            coordinators: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, P, R, S> CoordinatorRegistry<K, P, R, S>
where
    K: Eq + Hash + Clone + Debug,
    P: Clone,
    R: EntryRules<P>,
    S: EntryStore<Entry<P>>,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the coordinator for a newly initialized entity.
    ///
    /// # Errors
    ///
    /// Returns `EntityAlreadyRegistered` if `key` already has a coordinator.
    pub fn register(
        &self,
        key: K,
        coordinator: TransactionCoordinator<P, R, S>,
    ) -> TxnResult<SharedCoordinator<P, R, S>> {
        let mut coordinators = self.coordinators.write();
        if coordinators.contains_key(&key) {
            return Err(TxnError::EntityAlreadyRegistered {
                key: format!("{key:?}"),
            });
        }

        debug!(entity = ?key, "registered coordinator");
        let shared = Arc::new(Mutex::new(coordinator));
        coordinators.insert(key, Arc::clone(&shared));
        Ok(shared)
    }

    /// Returns the coordinator for `key`.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotRegistered` if there is none.
    pub fn get(&self, key: &K) -> TxnResult<SharedCoordinator<P, R, S>> {
        self.coordinators
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| TxnError::EntityNotRegistered {
                key: format!("{key:?}"),
            })
    }

    /// Runs `f` with exclusive access to the coordinator for `key`.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotRegistered` if there is none.
    pub fn with<T>(
        &self,
        key: &K,
        f: impl FnOnce(&mut TransactionCoordinator<P, R, S>) -> T,
    ) -> TxnResult<T> {
        let shared = self.get(key)?;
        let mut coordinator = shared.lock();
        Ok(f(&mut *coordinator))
    }

    /// Removes the coordinator of a torn-down entity.
    ///
    /// Any open transaction is discarded first.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotRegistered` if there is none.
    pub fn unregister(&self, key: &K) -> TxnResult<()> {
        let removed = self.coordinators.write().remove(key);
        let Some(shared) = removed else {
            return Err(TxnError::EntityNotRegistered {
                key: format!("{key:?}"),
            });
        };

        shared.lock().discard();
        debug!(entity = ?key, "unregistered coordinator");
        Ok(())
    }

    /// Returns true if `key` has a coordinator.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.coordinators.read().contains_key(key)
    }

    /// Returns the number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coordinators.read().len()
    }

    /// Returns true if no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coordinators.read().is_empty()
    }

    /// Returns the registered entity keys.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.coordinators.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::test_support::{new_entry, Colour, PaletteRules};
    use crate::transaction::TransactionState;
    use stagelist_store::InMemoryStore;
    use std::thread;

    type Registry = CoordinatorRegistry<u16, Colour, PaletteRules, InMemoryStore<Entry<Colour>>>;

    fn coordinator() -> TransactionCoordinator<Colour, PaletteRules, InMemoryStore<Entry<Colour>>> {
        TransactionCoordinator::new(
            InMemoryStore::new(),
            PaletteRules::new(8).with_limit(Colour::Red, 8),
            EngineConfig::default(),
        )
    }

    #[test]
    fn register_and_lookup() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        registry.register(1, coordinator()).unwrap();
        assert!(registry.contains(&1));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.keys(), vec![1]);

        let state = registry.with(&1, |c| c.state()).unwrap();
        assert_eq!(state, TransactionState::Idle);
    }

    #[test]
    fn duplicate_register_is_rejected() {
        let registry = Registry::new();
        registry.register(1, coordinator()).unwrap();

        let err = registry.register(1, coordinator()).unwrap_err();
        assert!(matches!(err, TxnError::EntityAlreadyRegistered { .. }));
    }

    #[test]
    fn missing_entity_is_reported() {
        let registry = Registry::new();
        assert!(matches!(
            registry.get(&3),
            Err(TxnError::EntityNotRegistered { .. })
        ));
        assert!(registry.with(&3, |_| ()).is_err());
        assert!(registry.unregister(&3).is_err());
    }

    #[test]
    fn unregister_discards_open_transaction() {
        let registry = Registry::new();
        let shared = registry.register(1, coordinator()).unwrap();
        registry
            .with(&1, |c| c.append(new_entry(Colour::Red)))
            .unwrap()
            .unwrap();
        assert_eq!(shared.lock().state(), TransactionState::Staging);

        registry.unregister(&1).unwrap();
        assert!(!registry.contains(&1));
        assert_eq!(shared.lock().state(), TransactionState::Idle);
    }

    #[test]
    fn entities_commit_independently() {
        let registry = Arc::new(Registry::new());
        for endpoint in 0..4 {
            registry.register(endpoint, coordinator()).unwrap();
        }

        let workers: Vec<_> = (0..4u16)
            .map(|endpoint| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..=endpoint {
                        registry
                            .with(&endpoint, |c| c.append(new_entry(Colour::Red)))
                            .unwrap()
                            .unwrap();
                    }
                    registry.with(&endpoint, |c| c.commit()).unwrap().unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        for endpoint in 0..4u16 {
            let count = registry
                .with(&endpoint, |c| c.committed_entries().unwrap().len())
                .unwrap();
            assert_eq!(count, usize::from(endpoint) + 1);
        }
    }
}
