//! Hashdex Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.hashdex/config.toml`
//! - Local config: `.hashdex/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.
//!
//! Besides connection and query settings, the config carries the declarative
//! document-type table (`[[documents]]`) used by tooling that has no compiled
//! document types of its own.

mod error;
mod loader;

pub use error::{ConfigError, FileAction};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// URL schemes accepted for `[store].url`.
const REDIS_SCHEMES: [&str; 4] = ["redis://", "rediss://", "unix://", "redis+unix://"];

/// Root configuration for Hashdex.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HashdexConfig {
    /// Store connection configuration
    pub store: StoreConfig,

    /// Query execution defaults
    pub query: QueryConfig,

    /// Index lifecycle configuration
    pub index: IndexConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Declared document types
    pub documents: Vec<DocumentConfig>,
}

/// Redis connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis server URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,

    /// ACL username (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Keys requested per SCAN round trip
    pub scan_batch_size: u32,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            username: None,
            password: None,
            scan_batch_size: 1000,
            connect_timeout_secs: 10,
        }
    }
}

/// Query execution defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size used when the caller does not pass one
    pub default_page_size: u32,

    /// Upper bound applied to caller-provided page sizes
    pub max_page_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 1000,
            max_page_size: 10_000,
        }
    }
}

/// Index lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexConfig {
    /// Reconcile every declared document type when a client connects
    pub reconcile_on_start: bool,

    /// Key prefix under which index records are stored (`<prefix>:<index>`)
    pub record_prefix: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            reconcile_on_start: true,
            record_prefix: "index".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// A declared document type.
///
/// # Example TOML
///
/// ```toml
/// [[documents]]
/// name = "cars"
///
/// [[documents.fields]]
/// name = "display_name"
/// value_type = "string"
///
/// [[documents.fields]]
/// name = "vin"
/// kind = "tag"
/// unique = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentConfig {
    /// Index name, also the key namespace (`<name>:<id>`)
    pub name: String,

    /// Indexed fields in declaration order
    pub fields: Vec<FieldConfig>,
}

/// A declared indexed field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FieldConfig {
    /// Hash field name
    pub name: String,

    /// Declared index kind
    pub kind: FieldKindSetting,

    /// Value type used to resolve `auto` (e.g. "i32", "string", "bool")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    /// Whether values must be unique across documents
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
}

/// Declared index kind as written in configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldKindSetting {
    /// Resolve from the value type
    #[default]
    Auto,
    /// Exact-match tag field
    Tag,
    /// Full-text field
    Text,
    /// Numeric range field
    Numeric,
}

impl std::fmt::Display for FieldKindSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Tag => write!(f, "tag"),
            Self::Text => write!(f, "text"),
            Self::Numeric => write!(f, "numeric"),
        }
    }
}

impl std::str::FromStr for FieldKindSetting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "tag" => Ok(Self::Tag),
            "text" => Ok(Self::Text),
            "numeric" | "number" => Ok(Self::Numeric),
            _ => Err(ConfigError::invalid_value(
                "kind",
                format!("unknown field kind '{}', expected auto, tag, text or numeric", s),
            )),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override Redis URL
    pub store_url: Option<String>,

    /// Override default page size
    pub page_size: Option<u32>,

    /// Override log level
    pub log_level: Option<String>,
}

impl HashdexConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref url) = overrides.store_url {
            self.store.url = url.clone();
        }

        if let Some(page_size) = overrides.page_size {
            self.query.default_page_size = page_size;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !REDIS_SCHEMES
            .iter()
            .any(|scheme| self.store.url.starts_with(scheme))
        {
            return Err(ConfigError::invalid_value(
                "store.url",
                format!("'{}' is not a redis://, rediss:// or unix:// URL", self.store.url),
            ));
        }
        if self.store.scan_batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "store.scan_batch_size",
                "must be greater than zero",
            ));
        }
        if self.query.default_page_size == 0 {
            return Err(ConfigError::invalid_value(
                "query.default_page_size",
                "must be greater than zero",
            ));
        }
        if self.query.max_page_size < self.query.default_page_size {
            return Err(ConfigError::invalid_value(
                "query.max_page_size",
                "must not be smaller than query.default_page_size",
            ));
        }

        if self.index.record_prefix.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "index.record_prefix",
                "must not be empty",
            ));
        }

        let mut names = HashSet::new();
        for doc in &self.documents {
            if doc.name.is_empty() {
                return Err(ConfigError::invalid_value(
                    "documents.name",
                    "every document type needs a name",
                ));
            }
            if doc.name.contains(':') {
                return Err(ConfigError::invalid_document(
                    &doc.name,
                    "name must not contain ':', it scopes the document keys",
                ));
            }
            if !names.insert(doc.name.as_str()) {
                return Err(ConfigError::invalid_document(
                    &doc.name,
                    "declared more than once",
                ));
            }

            let mut fields = HashSet::new();
            for field in &doc.fields {
                if field.name.is_empty() {
                    return Err(ConfigError::invalid_document(&doc.name, "field without a name"));
                }
                if !fields.insert(field.name.as_str()) {
                    return Err(ConfigError::invalid_document(
                        &doc.name,
                        format!("field '{}' is declared more than once", field.name),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Look up a declared document type by name.
    pub fn document(&self, name: &str) -> Option<&DocumentConfig> {
        self.documents.iter().find(|d| d.name == name)
    }
}
