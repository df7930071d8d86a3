//! Error types for the departure board.

use thiserror::Error;

/// Main error type for board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid subscription key: {0:?}")]
    InvalidSubscriptionKey(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for BoardError {
    fn from(e: serde_json::Error) -> Self {
        BoardError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => BoardError::HttpStatus(status.as_u16()),
            None => BoardError::Http(e.to_string()),
        }
    }
}

impl From<chrono::ParseError> for BoardError {
    fn from(e: chrono::ParseError) -> Self {
        BoardError::InvalidTimestamp(e.to_string())
    }
}

/// Result type for board operations.
pub type Result<T> = std::result::Result<T, BoardError>;
