//! CLI command implementations.

pub mod apply;
pub mod inspect;

use stagelist_core::Status;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// No store image in the directory.
    #[error("no store found at {0:?}")]
    NoStore(PathBuf),

    /// A handle in the operations file is not valid hex.
    #[error("invalid handle {0:?}: expected hex bytes")]
    BadHandle(String),

    /// The transaction did not commit.
    #[error("transaction failed with {0}")]
    Failed(Status),
}
