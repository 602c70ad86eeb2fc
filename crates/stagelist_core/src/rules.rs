//! Pluggable per-attribute rules.

use crate::error::TxnResult;
use crate::types::Entry;
use std::fmt::Debug;
use std::hash::Hash;

/// Attribute-specific rules consulted by the [`Validator`](crate::Validator).
///
/// One implementation exists per list attribute (schedules, presets, ...).
/// The transaction engine itself never looks inside a payload; it only asks
/// the rules which category an entry falls into, how many entries each
/// category may hold, and whether an entry is well formed.
pub trait EntryRules<P> {
    /// Discriminator used for per-category quotas.
    type Category: Clone + Eq + Hash + Debug;

    /// Returns the category of `entry`.
    fn category_of(&self, entry: &Entry<P>) -> Self::Category;

    /// Maximum number of entries in the whole list.
    fn max_entries(&self) -> usize;

    /// Maximum number of entries in `category`.
    ///
    /// Zero means the category is not supported at all; staging an entry of
    /// an unsupported category is a constraint error, not a quota error.
    fn max_per_category(&self, category: &Self::Category) -> usize;

    /// Checks the payload of a staged entry.
    ///
    /// # Errors
    ///
    /// Returns a constraint violation if the entry is malformed.
    fn check_entry(&self, _entry: &Entry<P>) -> TxnResult<()> {
        Ok(())
    }
}
