//! Configuration error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// File operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileAction::Read => write!(f, "read config file"),
            FileAction::Write => write!(f, "write config file"),
            FileAction::CreateDir => write!(f, "create config directory"),
        }
    }
}

/// Errors from loading, validating or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to {action} '{path}': {source}")]
    Io {
        action: FileAction,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A scalar setting is out of range or malformed
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// A `[[documents]]` entry is inconsistent
    #[error("invalid document type '{document}': {message}")]
    InvalidDocument { document: String, message: String },

    #[error("document type '{name}' not found in configuration")]
    DocumentNotFound { name: String },
}

impl ConfigError {
    pub fn io(action: FileAction, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn invalid_document(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            document: document.into(),
            message: message.into(),
        }
    }

    pub fn document_not_found(name: impl Into<String>) -> Self {
        Self::DocumentNotFound { name: name.into() }
    }
}
