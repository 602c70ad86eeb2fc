//! Core type definitions for StageList.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of an entry in the committed list.
///
/// Handles are byte strings chosen by the device. A null handle on client
/// input is modelled as `Option<Handle>::None` on [`Entry`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(Vec<u8>);

impl Handle {
    /// Creates a handle from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Creates a new random 16-byte handle.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().into_bytes().to_vec())
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({self})")
    }
}

/// Identifier for a staging transaction.
///
/// Transaction IDs are monotonically increasing per coordinator and never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Identifier for the client session that opened a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Creates a new session ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// One element of a list-valued attribute.
///
/// `built_in` is tri-state: `None` on client input means "not supplied",
/// while `None` on a committed entry means the entry is corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<P> {
    /// Handle of the entry, `None` for a new entry.
    #[serde(default)]
    pub handle: Option<Handle>,
    /// Whether the device provisioned this entry.
    #[serde(default)]
    pub built_in: Option<bool>,
    /// Attribute-specific payload.
    pub payload: P,
}

impl<P> Entry<P> {
    /// Creates a new entry with no handle and no built-in flag.
    #[must_use]
    pub fn new(payload: P) -> Self {
        Self {
            handle: None,
            built_in: None,
            payload,
        }
    }

    /// Sets the handle.
    #[must_use]
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Sets the built-in flag.
    #[must_use]
    pub fn with_built_in(mut self, built_in: bool) -> Self {
        self.built_in = Some(built_in);
        self
    }

    /// Returns true if the entry is flagged built-in.
    #[must_use]
    pub fn is_built_in(&self) -> bool {
        self.built_in.unwrap_or(false)
    }
}

/// Replacement content for an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryChanges<P> {
    /// Built-in flag as supplied by the client, if any.
    #[serde(default)]
    pub built_in: Option<bool>,
    /// New payload.
    pub payload: P,
}

impl<P> EntryChanges<P> {
    /// Creates changes that replace the payload only.
    #[must_use]
    pub fn new(payload: P) -> Self {
        Self {
            built_in: None,
            payload,
        }
    }

    /// Turns the changes into an entry targeting `handle`.
    #[must_use]
    pub fn into_entry(self, handle: Handle) -> Entry<P> {
        Entry {
            handle: Some(handle),
            built_in: self.built_in,
            payload: self.payload,
        }
    }
}
