//! # StageList Store
//!
//! Entry store delegates for StageList.
//!
//! This crate provides the lowest-level abstraction the transaction engine
//! talks to: an ordered, committed list of items reached by index, plus a
//! staging area that is swapped in atomically on commit.
//!
//! Stores are **opaque item lists** - they do not interpret the entries they
//! hold. Handle resolution, quotas and built-in rules all live in
//! `stagelist_core`.
//!
//! ## Design Principles
//!
//! - Reads are index based and signal exhaustion with `Ok(None)`
//! - A commit replaces the whole committed list at once
//! - Every commit bumps a revision counter so scans can detect mutation
//! - Persistence across restarts is entirely the store's business
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral lists
//! - [`FileStore`] - CBOR-backed list that survives restarts
//!
//! ## Example
//!
//! ```rust
//! use stagelist_store::{EntryStore, InMemoryStore};
//!
//! let mut store = InMemoryStore::new();
//! store.append_to_pending_list("weekday").unwrap();
//! store.commit_pending_list().unwrap();
//! assert_eq!(store.entry_at(0).unwrap(), Some("weekday"));
//! assert_eq!(store.entry_at(1).unwrap(), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::{FileStore, FORMAT_VERSION, STORE_FILE_NAME, STORE_MAGIC};
pub use memory::{InMemoryStore, StoreReader};
pub use store::EntryStore;
