//! Error types for email ingestion

use thiserror::Error;

/// Errors that can occur while parsing a raw message
#[derive(Error, Debug)]
pub enum ParseError {
    /// The message could not be parsed as MIME at all
    #[error("Failed to parse MIME structure: {0}")]
    Mime(#[from] mailparse::MailParseError),
}

/// Result type for parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised by an [`EmailStore`](crate::EmailStore) implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store refused the record
    #[error("Record rejected: {0}")]
    Rejected(String),

    /// The backing store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while processing a single message end to end
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The mail source failed to deliver raw messages
    #[error("Mail source failed: {0}")]
    Source(String),
}

/// Errors raised while loading processor configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
