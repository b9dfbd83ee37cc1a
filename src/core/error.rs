//! Docket Error Module
//!
//! This module defines the error type shared by the runner, the connection
//! providers, configuration loading and the command-line front end.
use thiserror::Error;

/// Error type for every fallible docket operation.
///
/// Engine failures are carried unchanged inside `Database` so callers see the
/// diagnostic SQLite produced:
/// - Connection open failures and provider errors
/// - Command execution and row conversion errors
/// - JSON deserialization of document rows
/// - Configuration loading
#[derive(Error, Debug)]
pub enum DocketError {
    /// Errors raised by SQLite while opening, executing or reading
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection handle used outside its open/close lifecycle
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed or mismatched JSON document payloads
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Command-line usage errors
    #[error("Command error: {0}")]
    Command(String),
}

/// Type alias for Result to use DocketError as the error type.
pub type Result<T> = std::result::Result<T, DocketError>;
