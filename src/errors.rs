use std::path::PathBuf;
use thiserror::Error;

/// The central error type for the Larder core.
///
/// This hierarchy separates the one user-visible error path (validation at
/// the mutation entry point) from the storage and remote failures that the
/// sync engine swallows at the cycle boundary.
#[derive(Error, Debug)]
pub enum LarderError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Rejections surfaced synchronously to the user at the mutation entry point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Quantity must be greater than zero (got {quantity})")]
    NonPositiveQuantity { quantity: f64 },

    #[error("No {entity} with id '{id}'")]
    NotFound { entity: &'static str, id: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read '{key}': {message}")]
    Read { key: String, message: String },

    #[error("Failed to write '{key}': {message}")]
    Write { key: String, message: String },

    #[error("Corrupt snapshot under '{key}': {message}")]
    Corrupt { key: String, message: String },

    #[error("Failed to create data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request timed out")]
    Timeout,

    #[error("Remote returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Failed to parse remote response: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, LarderError>;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_VALIDATION_ERROR: u8 = 3;
pub const EXIT_STORAGE_ERROR: u8 = 4;

/// Determine the appropriate process exit code for an error.
pub fn get_exit_code(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<LarderError>() {
        return match err {
            LarderError::Config(_) => EXIT_CONFIG_ERROR,
            LarderError::Validation(_) => EXIT_VALIDATION_ERROR,
            LarderError::Storage(_) => EXIT_STORAGE_ERROR,
            _ => EXIT_ERROR,
        };
    }

    // Direct enum unwraps fallback
    if e.downcast_ref::<ValidationError>().is_some() {
        return EXIT_VALIDATION_ERROR;
    }
    if e.downcast_ref::<StorageError>().is_some() {
        return EXIT_STORAGE_ERROR;
    }

    EXIT_ERROR
}
