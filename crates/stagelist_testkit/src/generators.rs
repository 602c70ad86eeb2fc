//! Property-based test generators using proptest.
//!
//! Provides strategies for committed lists and for sequences of staged
//! operations, including ones that the engine must reject.

use crate::fixtures::{committed, handle, tagged, Tagged, TestEntry};
use proptest::prelude::*;
use stagelist_core::{EntryChanges, EntryRules, Status, TransactionCoordinator};
use stagelist_store::EntryStore;

/// Tags used by the generators. `"c"` is left without a quota by the
/// property tests, so it exercises the unsupported-category path.
pub const TAGS: [&str; 3] = ["a", "b", "c"];

/// One staged operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedOp {
    /// Append a new entry.
    Append {
        /// Tag of the new entry.
        tag: &'static str,
        /// Value of the new entry.
        value: u32,
        /// Whether the client claims the entry is built-in.
        built_in: Option<bool>,
    },
    /// Edit the entry with a one-byte handle.
    Edit {
        /// Handle byte.
        handle: u8,
        /// New tag.
        tag: &'static str,
        /// New value.
        value: u32,
    },
    /// Delete the entry with a one-byte handle.
    Delete {
        /// Handle byte.
        handle: u8,
    },
}

impl StagedOp {
    /// Stages the operation and returns its status.
    pub fn apply<R, S>(&self, coordinator: &mut TransactionCoordinator<Tagged, R, S>) -> Status
    where
        R: EntryRules<Tagged>,
        S: EntryStore<TestEntry>,
    {
        match self {
            Self::Append {
                tag,
                value,
                built_in,
            } => {
                let mut entry = tagged(tag, *value);
                entry.built_in = *built_in;
                Status::from_result(&coordinator.append(entry))
            }
            Self::Edit { handle: h, tag, value } => {
                let changes = EntryChanges::new(tagged(tag, *value).payload);
                Status::from_result(&coordinator.edit(&handle(*h), changes))
            }
            Self::Delete { handle: h } => Status::from_result(&coordinator.delete(&handle(*h))),
        }
    }
}

/// Strategy for a tag.
pub fn tag_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(TAGS.to_vec())
}

/// Strategy for a committed list with handles `1..=n`, all flags present.
pub fn committed_list_strategy(max_len: usize) -> impl Strategy<Value = Vec<TestEntry>> {
    prop::collection::vec((tag_strategy(), any::<bool>()), 0..=max_len).prop_map(|pairs| {
        pairs
            .into_iter()
            .zip(1u8..)
            .map(|((tag, built_in), byte)| committed(byte, tag, built_in))
            .collect()
    })
}

/// Strategy for one staged operation against handles `1..=max_handle`.
///
/// Handles past the committed list produce `NotFound` paths.
pub fn staged_op_strategy(max_handle: u8) -> impl Strategy<Value = StagedOp> {
    prop_oneof![
        3 => (tag_strategy(), 0..100u32, prop::option::of(any::<bool>())).prop_map(
            |(tag, value, built_in)| StagedOp::Append {
                tag,
                value,
                built_in,
            }
        ),
        2 => (1..=max_handle, tag_strategy(), 0..100u32)
            .prop_map(|(handle, tag, value)| StagedOp::Edit { handle, tag, value }),
        2 => (1..=max_handle).prop_map(|handle| StagedOp::Delete { handle }),
    ]
}

/// Strategy for a sequence of staged operations.
pub fn staged_ops_strategy(max_handle: u8, max_len: usize) -> impl Strategy<Value = Vec<StagedOp>> {
    prop::collection::vec(staged_op_strategy(max_handle), 0..=max_len)
}
