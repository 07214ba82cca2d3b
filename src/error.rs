//! Error types for the collection tracker

use std::fmt;

/// Unified error type for collection tracker operations
#[derive(Debug)]
pub enum CollectionError {
    /// HTTP request failed (network error, timeout, etc.)
    Network(reqwest::Error),
    /// Failed to parse JSON
    Parse(serde_json::Error),
    /// HTTP error status code from an upstream service
    HttpStatus(reqwest::StatusCode),
    /// Database operation failed
    Database(rusqlite::Error),
    /// File I/O error
    Io(std::io::Error),
    /// CSV serialization failed
    Csv(csv::Error),
    /// Deck slug not found on the import service
    DeckNotFound(String),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::Network(e) => write!(f, "Network error: {}", e),
            CollectionError::Parse(e) => write!(f, "Parse error: {}", e),
            CollectionError::HttpStatus(status) => write!(f, "HTTP error: {}", status),
            CollectionError::Database(e) => write!(f, "Database error: {}", e),
            CollectionError::Io(e) => write!(f, "I/O error: {}", e),
            CollectionError::Csv(e) => write!(f, "CSV error: {}", e),
            CollectionError::DeckNotFound(slug) => {
                write!(f, "Deck not found on import service: {}", slug)
            }
        }
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectionError::Network(e) => Some(e),
            CollectionError::Parse(e) => Some(e),
            CollectionError::Database(e) => Some(e),
            CollectionError::Io(e) => Some(e),
            CollectionError::Csv(e) => Some(e),
            CollectionError::HttpStatus(_) => None,
            CollectionError::DeckNotFound(_) => None,
        }
    }
}

impl From<reqwest::Error> for CollectionError {
    fn from(err: reqwest::Error) -> Self {
        CollectionError::Network(err)
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(err: serde_json::Error) -> Self {
        CollectionError::Parse(err)
    }
}

impl From<rusqlite::Error> for CollectionError {
    fn from(err: rusqlite::Error) -> Self {
        CollectionError::Database(err)
    }
}

impl From<std::io::Error> for CollectionError {
    fn from(err: std::io::Error) -> Self {
        CollectionError::Io(err)
    }
}

impl From<csv::Error> for CollectionError {
    fn from(err: csv::Error) -> Self {
        CollectionError::Csv(err)
    }
}

/// Result alias for collection tracker operations
pub type Result<T> = std::result::Result<T, CollectionError>;
