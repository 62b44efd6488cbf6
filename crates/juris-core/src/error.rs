//! Error types for the juris system.

use thiserror::Error;

/// Result type alias using JurisError.
pub type Result<T> = std::result::Result<T, JurisError>;

/// Errors that can occur in the juris system.
#[derive(Error, Debug)]
pub enum JurisError {
    /// Matter not found.
    #[error("Matter not found: {id}")]
    MatterNotFound { id: String },

    /// Document not found.
    #[error("Document not found")]
    DocumentNotFound,

    /// Share not found.
    #[error("Share not found: {id}")]
    ShareNotFound { id: String },

    /// Rejected input. The message is complete and user-facing.
    #[error("{message}")]
    Input { message: String },

    /// Capability check failed. The message is complete and user-facing.
    #[error("{message}")]
    Forbidden { message: String },

    /// Batch passage insert failed mid-ingestion.
    #[error("Passage insert failed after {persisted} passages persisted: {message}")]
    StoreWrite { persisted: usize, message: String },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Completion backend error.
    #[error("Completion error: {message}")]
    Completion { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl JurisError {
    /// Create an input error.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create a completion error.
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion {
            message: message.into(),
        }
    }

    /// Create a store-write error carrying the partial-write count.
    pub fn store_write(persisted: usize, message: impl Into<String>) -> Self {
        Self::StoreWrite {
            persisted,
            message: message.into(),
        }
    }

    /// Get the stable error code for surface responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MatterNotFound { .. } => "MATTER_NOT_FOUND",
            Self::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            Self::ShareNotFound { .. } => "SHARE_NOT_FOUND",
            Self::Input { .. } => "INVALID_INPUT",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::StoreWrite { .. } => "STORE_WRITE_ERROR",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Completion { .. } => "COMPLETION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }
}
