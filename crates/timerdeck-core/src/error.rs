//! Core error types for timerdeck-core.
//!
//! Every failure in the core degrades to "state not as expected"; none of
//! these errors is fatal to the process.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timerdeck-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before any mutation happened
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persisted state could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Countdown registration failed
    #[error("Countdown error: {0}")]
    Countdown(#[from] CountdownError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No timer with this id in the live view
    #[error("Timer not found: {0}")]
    TimerNotFound(String),
}

/// Validation errors raised by `create`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Timer name must not be empty")]
    EmptyName,

    #[error("Timer category must not be empty")]
    EmptyCategory,

    #[error("Timer duration must be a positive number of seconds")]
    NonPositiveDuration,
}

/// Key-value storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The stored payload exists but is not valid JSON for the expected shape.
    #[error("Malformed payload under '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize a payload before writing it.
    #[error("Failed to encode payload for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The backend rejected a read or write.
    #[error("Storage backend failed: {0}")]
    Backend(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

impl StorageError {
    /// Whether this error came from a payload that failed to parse.
    pub fn is_malformed(&self) -> bool {
        matches!(self, StorageError::Malformed { .. })
    }
}

/// Countdown driver errors.
#[derive(Error, Debug)]
pub enum CountdownError {
    /// `start` was called outside of a tokio runtime.
    #[error("No tokio runtime available to drive countdown for timer {timer_id}")]
    NoRuntime { timer_id: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(#[source] std::io::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::Backend(err.to_string())
                }
            }
            _ => StorageError::Backend(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
