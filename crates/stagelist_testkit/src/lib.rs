//! # StageList Testkit
//!
//! Test utilities for StageList.
//!
//! This crate provides:
//! - A tagged test payload with configurable rules
//! - Entry stores that misbehave the way real delegates can
//! - Property-based test generators using proptest
//! - Temporary file store helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagelist_testkit::prelude::*;
//!
//! #[test]
//! fn test_commit() {
//!     let mut coordinator = coordinator(vec![], TaggedRules::new(4).with_limit("a", 2), Default::default());
//!     coordinator.append(tagged("a", 1)).unwrap();
//!     coordinator.commit().unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
