//! Error types for audit-tools
//!
//! Only provider resolution and literal parsing surface errors to callers.
//! Request capture catches the request access variants internally and
//! degrades to raw values instead.

use thiserror::Error;

/// Main error type for audit-tools operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// Dotted path is not of the form `module.path.attribute`
    #[error("Invalid import path '{0}': expected 'module.attribute'")]
    InvalidPath(String),

    /// Module segment of a dotted path is not registered
    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    /// Module exists but does not export the requested attribute
    #[error("Module '{module}' has no attribute '{attribute}'")]
    AttributeNotFound { module: String, attribute: String },

    /// Stringified metadata could not be read back as a mapping
    #[error("Failed to parse metadata literal: {0}")]
    Parse(String),

    /// Header value could not be read as visible ASCII
    #[error("Invalid header value for '{0}'")]
    InvalidHeader(String),

    /// Query string or form body is not valid urlencoded data
    #[error("Invalid urlencoded data: {0}")]
    InvalidQuery(String),

    /// Cookie header could not be parsed
    #[error("Invalid cookie header: {0}")]
    InvalidCookie(String),

    /// Form body was sent but not kept for the snapshot
    #[error("Request body not captured: {0}")]
    BodyNotCaptured(String),

    /// JSON serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error for unexpected failures
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AuditError {
    /// Create a generic error from any error type
    pub fn from_string(msg: impl Into<String>) -> Self {
        AuditError::Other(msg.into())
    }
}
