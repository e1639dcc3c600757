//! # Core Type Definitions
//!
//! This module contains the shared types of the title registry:
//! - Versioned ledger values (`Versioned`)
//! - Creation semantics (`CreatePolicy`)
//! - Error types (`LedgerError`)
//!
//! The title record itself lives in [`crate::codec`] next to its encoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// VERSIONED VALUE
// =============================================================================

/// A ledger value together with the version stamp it was read at.
///
/// Versions are per key and strictly increase with every successful write,
/// including writes that follow a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    /// Version stamp of the key at read time.
    pub version: u64,
    /// Raw stored bytes.
    pub bytes: Vec<u8>,
}

impl Versioned {
    /// Create a new versioned value.
    #[must_use]
    pub fn new(version: u64, bytes: Vec<u8>) -> Self {
        Self { version, bytes }
    }
}

// =============================================================================
// CREATE POLICY
// =============================================================================

/// What `init_title` does when a record already exists at the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatePolicy {
    /// Overwrite the existing record and append the id to the index again.
    #[default]
    Upsert,
    /// Refuse with [`LedgerError::AlreadyExists`].
    CreateOnly,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the title registry.
///
/// - No silent failures
/// - Every message names the failing precondition or key
/// - The registry never panics; all errors are returned to the dispatcher
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Wrong argument count, empty required field or unparseable integer.
    #[error("Invalid arguments: {0}")]
    Argument(String),

    /// Stored bytes are not a well-formed record or index.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The key is absent from the ledger.
    #[error("Failed to get state for {0}")]
    NotFound(String),

    /// A create-only insert hit an existing record.
    #[error("Title already exists: {0}")]
    AlreadyExists(String),

    /// The ledger failed a read.
    #[error("Ledger read failed: {0}")]
    Store(String),

    /// The ledger failed a put.
    #[error("Failed to write state for {key}: {reason}")]
    Write { key: String, reason: String },

    /// The ledger failed a delete.
    #[error("Failed to delete state for {key}: {reason}")]
    Delete { key: String, reason: String },

    /// The dispatcher received an operation name with no handler.
    #[error("Received unknown function invocation: {0}")]
    UnknownOperation(String),

    /// Compare-and-swap retries were exhausted.
    #[error("Concurrent modification of {key} not resolved after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },

    /// An earlier store call of the operation committed, a later one failed.
    ///
    /// The ledger is left inconsistent and needs reconciliation.
    #[error("Partial failure in {operation} for {key}: {source}")]
    PartialFailure {
        operation: &'static str,
        key: String,
        #[source]
        source: Box<LedgerError>,
    },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl LedgerError {
    /// Stable snake_case label for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Argument(_) => "argument",
            Self::Decode(_) => "decode",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Store(_) => "store",
            Self::Write { .. } => "write",
            Self::Delete { .. } => "delete",
            Self::UnknownOperation(_) => "unknown_operation",
            Self::Conflict { .. } => "conflict",
            Self::PartialFailure { .. } => "partial_failure",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Wrap an error raised after an earlier write of `operation` committed.
    pub(crate) fn partial(operation: &'static str, key: &str, source: LedgerError) -> Self {
        Self::PartialFailure {
            operation,
            key: key.to_string(),
            source: Box::new(source),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_key() {
        let err = LedgerError::NotFound("V1".to_string());
        assert_eq!(err.to_string(), "Failed to get state for V1");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn partial_failure_keeps_source() {
        let err = LedgerError::partial(
            "init_title",
            "V1",
            LedgerError::Write {
                key: "_title_index".to_string(),
                reason: "disk full".to_string(),
            },
        );
        assert_eq!(err.kind(), "partial_failure");
        let text = err.to_string();
        assert!(text.contains("init_title"));
        assert!(text.contains("disk full"));
    }
}
