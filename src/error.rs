//! Error types for collection_tracker

use std::fmt;

/// Unified error type for collection tracker operations
#[derive(Debug)]
pub enum TrackerError {
    /// Malformed input (missing required field, bad quantity, empty name)
    Validation(String),
    /// Referenced card, deck or deck entry does not exist
    NotFound(String),
    /// HTTP request failed (network error, timeout, etc.)
    Network(reqwest::Error),
    /// Failed to parse JSON response
    Parse(serde_json::Error),
    /// HTTP error status code from the card-data service
    HttpStatus(reqwest::StatusCode),
    /// Card not found on Scryfall
    CardNotFound(String),
    /// Database operation failed
    Database(rusqlite::Error),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Validation(msg) => write!(f, "{}", msg),
            TrackerError::NotFound(what) => write!(f, "{} not found", what),
            TrackerError::Network(e) => write!(f, "Network error: {}", e),
            TrackerError::Parse(e) => write!(f, "Parse error: {}", e),
            TrackerError::HttpStatus(status) => write!(f, "HTTP error: {}", status),
            TrackerError::CardNotFound(name) => {
                write!(f, "Card not found on Scryfall: {}", name)
            }
            TrackerError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Network(e) => Some(e),
            TrackerError::Parse(e) => Some(e),
            TrackerError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Network(err)
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Parse(err)
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::Database(err)
    }
}

/// Result alias for collection tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
