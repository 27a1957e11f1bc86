//! # Property Errors
//!
//! Error taxonomy for property cells.
//!
//! ## Table of Contents
//! 1. PropertyError - Main error enum
//! 2. Result type alias
//! 3. Helpers for dynamic-value type errors

use docprop_stream::StreamError;
use thiserror::Error;

use crate::dynamic::DynValue;

/// Result type alias for property operations
pub type Result<T> = std::result::Result<T, PropertyError>;

/// Errors raised by property cells
#[derive(Error, Debug)]
pub enum PropertyError {
    // ========================================================================
    // Value Errors
    // ========================================================================

    /// A dynamic value of the wrong type was supplied
    #[error("{0}")]
    TypeMismatch(String),

    /// The value has the right type but is not acceptable
    #[error("{0}")]
    ValueRejected(String),

    /// Text that must be UTF-8 was not
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The cell is in a state that cannot answer the request
    #[error("{0}")]
    Runtime(String),

    #[error("index out of bound: {index} (size {size})")]
    IndexOutOfBounds { index: i64, size: usize },

    // ========================================================================
    // Protocol Errors
    // ========================================================================

    #[error("Cannot paste {found} into {expected}")]
    SameKindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{property} cannot be set from a value of type {given}")]
    BadCast { property: String, given: String },

    #[error("Invalid path '{path}' for {property}")]
    InvalidPath { property: String, path: String },

    // ========================================================================
    // Persistence Errors
    // ========================================================================

    #[error(transparent)]
    Stream(StreamError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PropertyError {
    /// Short stable code for logs and scripting hosts
    pub fn code(&self) -> &'static str {
        match self {
            PropertyError::TypeMismatch(_) => "TypeError",
            PropertyError::ValueRejected(_) => "ValueError",
            PropertyError::Encoding(_) => "UnicodeError",
            PropertyError::Runtime(_) => "RuntimeError",
            PropertyError::IndexOutOfBounds { .. } => "IndexError",
            PropertyError::SameKindMismatch { .. } => "TypeError",
            PropertyError::BadCast { .. } => "BadCast",
            PropertyError::InvalidPath { .. } => "PathError",
            PropertyError::Stream(_) | PropertyError::Io(_) => "IOError",
            PropertyError::Config(_) => "ConfigError",
        }
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, PropertyError::TypeMismatch(_))
    }

    pub fn is_value_rejected(&self) -> bool {
        matches!(self, PropertyError::ValueRejected(_))
    }
}

impl From<StreamError> for PropertyError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Utf8(e) => PropertyError::Encoding(e.to_string()),
            other => PropertyError::Stream(other),
        }
    }
}

impl From<std::string::FromUtf8Error> for PropertyError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        PropertyError::Encoding(err.to_string())
    }
}

/// `"<expected>, not <actual type>"` as a `TypeMismatch`
pub fn type_error(expected: &str, actual: &DynValue) -> PropertyError {
    PropertyError::TypeMismatch(format!("{}, not {}", expected, actual.type_name()))
}

/// `BadCast` for a path value whose native type is not accepted
pub(crate) fn bad_cast(property: &str, value: &dyn std::any::Any) -> PropertyError {
    let given = if value.is::<crate::dynamic::DynValue>() {
        "dynamic value"
    } else {
        "unsupported native type"
    };
    PropertyError::BadCast {
        property: property.to_string(),
        given: given.to_string(),
    }
}
