//! Error types for rangeidx
//!
//! Provides a unified error type for all index operations.

use thiserror::Error;

use crate::value::Value;

/// Result type alias using IndexError
pub type Result<T> = std::result::Result<T, IndexError>;

/// Unified error type for rangeidx operations
#[derive(Debug, Error)]
pub enum IndexError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    /// Unsupported index type, schema shape, query or value.
    /// Rejected before anything reaches storage.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Constraint Errors
    // -------------------------------------------------------------------------
    /// Two entities share the same value tuple on a unique index.
    #[error("{message}")]
    ConstraintViolation {
        existing_entity_id: u64,
        added_entity_id: u64,
        values: Vec<Value>,
        message: String,
    },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// On-disk structure is inconsistent. The index must be rebuilt.
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    /// An operation was called in a lifecycle state that does not allow it.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Index population aborted: {0}")]
    PopulationAborted(String),
}

impl IndexError {
    /// Whether this error is a uniqueness violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, IndexError::ConstraintViolation { .. })
    }

    /// Entity ids involved in a uniqueness violation, as `(existing, added)`
    pub fn conflicting_entities(&self) -> Option<(u64, u64)> {
        match self {
            IndexError::ConstraintViolation {
                existing_entity_id,
                added_entity_id,
                ..
            } => Some((*existing_entity_id, *added_entity_id)),
            _ => None,
        }
    }
}

impl From<bincode::Error> for IndexError {
    fn from(e: bincode::Error) -> Self {
        IndexError::Serialization(e.to_string())
    }
}
