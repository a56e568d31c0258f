//! Error types for migration-report
//!
//! Classified migration issues are never errors here: they are recorded in
//! the statistics. Only the unclassified fallback, precondition violations
//! and store I/O reach the caller.

use thiserror::Error;

/// Report error type
#[derive(Debug, Error)]
pub enum ReportError {
    /// An issue outside the known taxonomy, re-raised instead of recorded
    #[error("Unclassified error for record {identity}: {message}")]
    Unclassified { identity: String, message: String },

    /// Outcome recorded against an identity that was never registered
    #[error("Record {0} was never registered")]
    UnregisteredIdentity(String),

    /// Neither `recid` nor `legacy_recid` could be read from the input item
    #[error("No recid or legacy_recid found in input item")]
    MissingIdentity,

    /// Ingestion or clustering found data it cannot work with
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// JSON encoding error while building record payloads
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// migration-common error (store I/O, configuration)
    #[error(transparent)]
    Common(#[from] migration_common::Error),
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
