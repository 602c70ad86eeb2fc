//! Staged list transactions.
//!
//! A remote client stages adds, edits and deletes against a list attribute,
//! then asks for an atomic commit. The commit either validates and replaces
//! the whole committed list or leaves it untouched:
//! - **Staging**: every operation is validated on arrival and a rejected one
//!   never reaches the overlay
//! - **Precommit**: the committed list is re-scanned and every staged
//!   operation re-validated before the merged list is built
//! - **Commit**: the merged list replaces the committed list in one swap
//! - **Abort**: any failure after staging drops the whole overlay

mod coordinator;
mod overlay;
mod state;

pub use coordinator::TransactionCoordinator;
pub use overlay::{DeleteTarget, PendingOverlay, PendingWrite};
pub use state::{Transaction, TransactionState};
