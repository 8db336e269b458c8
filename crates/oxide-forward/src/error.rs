//! Error types for forward engineering.

use std::path::PathBuf;

use crate::legalize::Namespace;
use crate::types::TypeCode;

/// Errors that can occur while generating or applying DDL.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// A portable type code has no entry in the dialect's type map.
    ///
    /// Generation recovers from this locally by substituting the dialect's
    /// fallback descriptor, so it only escapes from direct type map lookups.
    #[error("Type {code} is not mapped by dialect '{dialect}'")]
    UnmappedType {
        /// The unmapped portable type code.
        code: TypeCode,
        /// Name of the dialect that was consulted.
        dialect: String,
    },

    /// No unique legal identifier could be produced for an object.
    #[error("Cannot legalize {namespace} name '{name}': {reason}")]
    Legalization {
        /// Namespace the name was being legalized in.
        namespace: Namespace,
        /// The raw name.
        name: String,
        /// Why legalization gave up.
        reason: String,
    },

    /// The schema graph is inconsistent (dangling references and the like).
    #[error("Invalid schema graph: {0}")]
    Structural(String),

    /// Reading the target database's metadata failed.
    #[error("Failed to scan target database for conflicts with {object}: {message}")]
    ConflictScan {
        /// The object being inspected when the scan failed.
        object: String,
        /// Error message reported by the target.
        message: String,
    },

    /// A statement failed when executed against the target database.
    #[error("Statement for {subject} failed: {message}\n{statement}")]
    Execution {
        /// The object the statement affects.
        subject: String,
        /// The statement text as submitted.
        statement: String,
        /// Error message reported by the target, verbatim.
        message: String,
    },

    /// An operation was invoked in the wrong state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A dialect name that is neither built in nor defined in configuration.
    #[error("Unknown dialect '{0}'")]
    UnknownDialect(String),

    /// Database driver error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading schema, dialect or configuration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration or schema file could not be parsed.
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for forward engineering operations.
pub type Result<T> = std::result::Result<T, ForwardError>;
