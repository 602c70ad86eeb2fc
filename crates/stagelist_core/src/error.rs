//! Error types for StageList core.

use crate::types::{Handle, TransactionId};
use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type TxnResult<T> = Result<T, TxnError>;

/// Errors that can occur while staging or committing a transaction.
#[derive(Debug, Error)]
pub enum TxnError {
    /// Client input violates a structural or business rule.
    #[error("constraint violation: {message}")]
    ConstraintViolation {
        /// Description of the violated rule.
        message: String,
    },

    /// Referenced handle is not in the committed list.
    #[error("handle not found: {handle}")]
    HandleNotFound {
        /// The handle that was looked up.
        handle: Handle,
    },

    /// The list would hold more entries than allowed.
    #[error("entry limit exceeded: {count} > {limit}")]
    EntryLimitExceeded {
        /// Projected entry count.
        count: usize,
        /// Maximum number of entries.
        limit: usize,
    },

    /// A category would hold more entries than allowed.
    #[error("category {category} limit exceeded: {count} > {limit}")]
    CategoryLimitExceeded {
        /// The category, as debug text.
        category: String,
        /// Projected count in the category.
        count: usize,
        /// Maximum number of entries in the category.
        limit: usize,
    },

    /// Committed data is missing a required field or is otherwise corrupt.
    #[error("corrupt committed entry: {message}")]
    CorruptEntry {
        /// Description of the corruption.
        message: String,
    },

    /// Entry store error.
    #[error("store error: {0}")]
    Store(#[from] stagelist_store::StoreError),

    /// The committed list changed while it was being scanned.
    #[error("committed list changed during scan (revision {before} -> {after})")]
    ScanUnstable {
        /// Revision observed before the scan.
        before: u64,
        /// Revision observed after the scan.
        after: u64,
    },

    /// The store never signalled exhaustion.
    #[error("store returned more than {limit} entries")]
    ScanOverrun {
        /// Number of indices probed.
        limit: usize,
    },

    /// The operation needs an open transaction.
    #[error("no transaction in progress")]
    NoTransaction,

    /// A transaction is already open on this entity.
    #[error("transaction {id} already in progress")]
    TransactionInProgress {
        /// The transaction holding the entity.
        id: TransactionId,
    },

    /// Staging is not allowed in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// No coordinator is registered for the entity.
    #[error("entity not registered: {key}")]
    EntityNotRegistered {
        /// The entity key, as debug text.
        key: String,
    },

    /// A coordinator is already registered for the entity.
    #[error("entity already registered: {key}")]
    EntityAlreadyRegistered {
        /// The entity key, as debug text.
        key: String,
    },
}

impl TxnError {
    /// Creates a constraint violation error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Creates a handle not found error.
    pub fn not_found(handle: &Handle) -> Self {
        Self::HandleNotFound {
            handle: handle.clone(),
        }
    }

    /// Creates a corrupt entry error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptEntry {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the status reported to the attribute-access framework.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::ConstraintViolation { .. } => Status::ConstraintError,
            Self::HandleNotFound { .. } => Status::NotFound,
            Self::EntryLimitExceeded { .. } | Self::CategoryLimitExceeded { .. } => {
                Status::ResourceExhausted
            }
            Self::CorruptEntry { .. }
            | Self::Store(_)
            | Self::ScanUnstable { .. }
            | Self::ScanOverrun { .. }
            | Self::NoTransaction
            | Self::TransactionInProgress { .. }
            | Self::InvalidOperation { .. }
            | Self::EntityNotRegistered { .. }
            | Self::EntityAlreadyRegistered { .. } => Status::InvalidInState,
        }
    }

    /// Returns true if the error ends the whole transaction.
    ///
    /// Client rejections only drop the offending operation; everything that
    /// reports `InvalidInState` means the engine can no longer trust its view
    /// of the list.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.status() == Status::InvalidInState
    }
}

/// Outcome of an operation as seen by the attribute-access framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation was applied.
    Success,
    /// Client input violates a rule.
    ConstraintError,
    /// A referenced handle does not exist.
    NotFound,
    /// A quota would be exceeded.
    ResourceExhausted,
    /// The engine or its store is not in a usable state.
    InvalidInState,
}

impl Status {
    /// Collapses an engine result into a status.
    #[must_use]
    pub fn from_result<T>(result: &TxnResult<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) => err.status(),
        }
    }

    /// Returns true for [`Status::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::ConstraintError => "CONSTRAINT_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::InvalidInState => "INVALID_IN_STATE",
        };
        f.write_str(name)
    }
}
