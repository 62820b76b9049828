//! Error types for the navigation crate.

use thiserror::Error;

/// Errors surfaced by hierarchy lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// The lookup backend failed (network, storage, permissions).
    #[error("Hierarchy lookup failed: {0}")]
    LookupFailed(String),
}

/// Result type alias for navigation operations.
pub type Result<T> = std::result::Result<T, NavigationError>;
