//! Core error types.

use thiserror::Error;

/// Errors raised while loading, validating or checking a mapping.
#[derive(Debug, Error)]
pub enum Error {
    /// The storage engine failed to prepare or step a statement.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The persisted catalog references rows that do not exist.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// A persisted enum column holds a code this version does not know.
    #[error("unknown {kind} value {value} in {context}")]
    UnknownEnumValue {
        /// Name of the enum being decoded.
        kind: &'static str,
        /// The raw persisted value.
        value: i64,
        /// Where the value was read from.
        context: String,
    },

    /// A single mapping rule was violated. Already reported to the issue sink.
    #[error("mapping violation: {0}")]
    MappingViolation(String),

    /// Validation finished with reported issues.
    #[error("mapping validation failed with {issues} issue(s)")]
    ValidationFailed {
        /// Number of issues reported during the run.
        issues: usize,
    },

    /// A named object could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The stored profile version could not be parsed.
    #[error("invalid profile version: {0}")]
    InvalidProfileVersion(String),
}

impl Error {
    /// Whether the error has already been written to an issue sink.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            Error::MappingViolation(_) | Error::ValidationFailed { .. }
        )
    }
}
