//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("reference not found: {name}")]
    NotFound { name: String },

    /// A reference with this name already exists.
    #[error("reference already exists: {name}")]
    AlreadyExists { name: String },

    /// The reference name is invalid.
    #[error("invalid reference name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A reference head must name a commit; the null id is never valid.
    #[error("reference head must not be the null id: {name}")]
    NullHead { name: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a persistent backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for reference operations.
pub type RefResult<T> = std::result::Result<T, RefError>;
