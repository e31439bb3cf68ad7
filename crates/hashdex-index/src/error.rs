//! Error types for hashdex-index

use thiserror::Error;

/// Errors that can occur in hashdex-index operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// Predicate shape the compiler cannot translate
    #[error("unsupported predicate: {0}")]
    UnsupportedPredicate(String),

    /// Predicate references a field the document type does not index
    #[error("field '{field}' is not an indexed field of '{index}'")]
    UnknownField { index: String, field: String },

    /// Indexed field without the metadata needed to resolve its kind
    #[error("schema configuration error in '{index}': {message}")]
    SchemaConfig { index: String, message: String },

    /// Store command failed
    #[error("store error: {0}")]
    Store(String),

    /// Connection error
    #[error("connection failed: {0}")]
    Connection(String),

    /// Store replied with something the caller could not interpret
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] hashdex_config::ConfigError),
}

impl IndexError {
    /// Create an UnsupportedPredicate error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedPredicate(message.into())
    }

    /// Create an UnknownField error.
    pub fn unknown_field(index: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            index: index.into(),
            field: field.into(),
        }
    }

    /// Create a SchemaConfig error.
    pub fn schema_config(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaConfig {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidResponse error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Whether this error was raised while translating a predicate,
    /// before any store call.
    pub fn is_compilation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPredicate(_) | Self::UnknownField { .. }
        )
    }
}

impl From<redis::RedisError> for IndexError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            IndexError::Connection(err.to_string())
        } else {
            IndexError::Store(err.to_string())
        }
    }
}

/// Result type for hashdex-index operations
pub type Result<T> = std::result::Result<T, IndexError>;
