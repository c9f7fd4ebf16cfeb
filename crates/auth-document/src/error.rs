//! Parse error types.

use thiserror::Error;

/// Error type for document parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Malformed JSON or a missing required field
    #[error("Failed to decode document: {0}")]
    DecodeFailure(String),
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::DecodeFailure(e.to_string())
    }
}

/// Result type for document parsing.
pub type ParseResult<T> = Result<T, ParseError>;
