//! Error taxonomy for shelfdb
//!
//! Every public operation either returns a well-formed result or exactly one
//! of these errors. Nothing is retried or swallowed inside the crate.

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// An identifier failed sanitization (empty, too long, or path-unsafe)
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Create on an existing path, or insert with an existing record id
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Operation on an absent user, database, table, or record
    #[error("{0} not found")]
    NotFound(String),

    /// Bounded lock acquisition expired
    #[error("timed out waiting for lock on {0}")]
    LockTimeout(String),

    /// Payload could not be represented as JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
