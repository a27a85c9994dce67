//! Error types for carelog.
//!
//! This module defines all error types used throughout the carelog crate,
//! providing detailed context for debugging and a single user-facing message
//! for failed submissions.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown to staff when a record could not be saved.
pub const SAVE_FAILED_MESSAGE: &str = "記録の保存中にエラーが発生しました";

/// The main error type for carelog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// A record with the same id is already in the event log.
    #[error("duplicate record id: {id}")]
    DuplicateRecord {
        /// The conflicting record id.
        id: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Directory Errors ===
    /// The resident directory rejected an operation.
    #[error("directory error: {0}")]
    Directory(String),

    /// No resident with the given id exists.
    #[error("unknown resident: {0}")]
    UnknownResident(String),

    // === Record Errors ===
    /// The identifier does not name one of the known event categories.
    #[error("unknown event category: {0}")]
    UnknownCategory(String),

    /// A payload failed its form-level validation.
    #[error("invalid {category} payload: {message}")]
    InvalidPayload {
        /// Category of the rejected payload.
        category: &'static str,
        /// Description of the validation failure.
        message: String,
    },

    /// The submitted payload belongs to a different category than the one selected.
    #[error("payload category '{payload}' does not match selected category '{selected}'")]
    CategoryMismatch {
        /// Category currently selected in the recorder.
        selected: &'static str,
        /// Category carried by the payload.
        payload: &'static str,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for carelog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new directory error.
    #[must_use]
    pub fn directory(message: impl Into<String>) -> Self {
        Self::Directory(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a payload validation error.
    #[must_use]
    pub fn invalid_payload(category: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            category,
            message: message.into(),
        }
    }

    /// Check if this error was raised by form-level validation, before any write.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPayload { .. } | Self::CategoryMismatch { .. } | Self::UnknownCategory(_)
        )
    }

    /// Check if this error came from the resident directory.
    #[must_use]
    pub fn is_directory_error(&self) -> bool {
        matches!(self, Self::Directory(_) | Self::UnknownResident(_))
    }

    /// The message shown to staff.
    ///
    /// Validation errors keep their detail; every persistence failure collapses
    /// into one generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_validation_error() {
            self.to_string()
        } else {
            SAVE_FAILED_MESSAGE.to_string()
        }
    }
}
