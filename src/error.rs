//! Central error types for depflow.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic
//! `Display` and `From` implementations.
//!
//! Event processing itself is infallible by design: unmatched identities,
//! unresolvable handles and a disabled oracle are all normal outcomes, not
//! errors. Everything in this enum is a boundary condition raised during
//! session setup, before any event is processed.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum DepflowError {
    /// Invalid session configuration (bad descriptor, empty endpoint list, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Endpoint registration attempted after the registry was frozen
    #[error("Registry is frozen: cannot register {0}")]
    RegistryFrozen(&'static str),

    /// Endpoint target failed its validity predicate
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Same identity registered twice on the same side of the registry
    #[error("Duplicate {side} target: {identity}")]
    DuplicateTarget {
        side: &'static str,
        identity: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience type alias for Results using DepflowError.
pub type Result<T> = std::result::Result<T, DepflowError>;
