//! Shared helpers for unit tests.

use crate::rules::EntryRules;
use crate::types::{Entry, Handle};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Colour {
    Red,
    Blue,
    Green,
}

/// Rules where an entry's category is its colour.
///
/// Colours without a limit are unsupported.
#[derive(Debug, Clone)]
pub(crate) struct PaletteRules {
    max_entries: usize,
    limits: HashMap<Colour, usize>,
}

impl PaletteRules {
    pub(crate) fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            limits: HashMap::new(),
        }
    }

    pub(crate) fn with_limit(mut self, colour: Colour, limit: usize) -> Self {
        self.limits.insert(colour, limit);
        self
    }
}

impl EntryRules<Colour> for PaletteRules {
    type Category = Colour;

    fn category_of(&self, entry: &Entry<Colour>) -> Colour {
        entry.payload
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn max_per_category(&self, category: &Colour) -> usize {
        self.limits.get(category).copied().unwrap_or(0)
    }
}

pub(crate) fn new_entry(colour: Colour) -> Entry<Colour> {
    Entry::new(colour)
}

pub(crate) fn committed(byte: u8, colour: Colour, built_in: Option<bool>) -> Entry<Colour> {
    Entry {
        handle: Some(Handle::from_bytes(vec![byte])),
        built_in,
        payload: colour,
    }
}
