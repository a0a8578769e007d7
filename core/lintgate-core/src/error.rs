//! Error types for lintgate-core operations.
//!
//! Validation failures are not errors: a failing lint or test command is data in
//! an [`ExecutionResult`](crate::executor::ExecutionResult). The variants here cover
//! the few places a caller can actually react to something going wrong.

use std::path::PathBuf;

/// All errors that can occur in lintgate-core operations.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    // ─────────────────────────────────────────────────────────────────────
    // Lock Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to release lock {path}: {source}")]
    LockRelease {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Skip Registry Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Skip path must be absolute: {0}")]
    InvalidSkipPath(PathBuf),

    #[error("Invalid skip kind: {0} (expected lint, test or all)")]
    InvalidSkipKind(String),

    #[error("Skip registry corrupted: {path}: {details}")]
    RegistryCorrupted { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using GateError.
pub type Result<T> = std::result::Result<T, GateError>;

impl From<GateError> for String {
    fn from(err: GateError) -> String {
        err.to_string()
    }
}
