//! # Stream Errors
//!
//! Error types shared by the XML writer/reader and the binary streams.
//!
//! ## Table of Contents
//! 1. StreamError - Main error enum
//! 2. Result type alias

use thiserror::Error;

/// Result type alias for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors raised while writing or reading a persisted document
#[derive(Error, Debug)]
pub enum StreamError {
    // ========================================================================
    // Transport Errors
    // ========================================================================

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid UTF-8 in binary stream: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    // ========================================================================
    // Document Structure Errors
    // ========================================================================

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Unexpected end of document while looking for <{0}>")]
    UnexpectedEof(String),

    #[error("No current element to read attribute '{0}' from")]
    NoCurrentElement(String),

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
}

impl StreamError {
    /// Whether this error came from truncated or malformed input rather than the OS
    pub fn is_format_error(&self) -> bool {
        !matches!(self, StreamError::Io(_))
    }
}
