//! Registry of known document types
//!
//! The enumeration source for startup reconciliation. Types are registered
//! explicitly, either from code or from the `[[documents]]` config table.

use std::collections::BTreeMap;

use hashdex_config::HashdexConfig;
use tracing::debug;

use crate::error::Result;
use crate::schema::DocumentSchema;

/// Known document types keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, DocumentSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the configured document table.
    pub fn from_config(config: &HashdexConfig) -> Result<Self> {
        let mut registry = Self::new();
        for document in &config.documents {
            registry.register(DocumentSchema::from_config(document)?);
        }
        Ok(registry)
    }

    /// Register a schema, replacing any previous schema with the same name.
    ///
    /// Returns the replaced schema.
    pub fn register(&mut self, schema: DocumentSchema) -> Option<DocumentSchema> {
        debug!("Registering document type '{}'", schema.name());
        self.schemas.insert(schema.name().to_string(), schema)
    }

    pub fn get(&self, name: &str) -> Option<&DocumentSchema> {
        self.schemas.get(name)
    }

    /// All registered schemas, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentSchema> {
        self.schemas.values()
    }

    /// Registered schemas with at least one indexed field.
    pub fn indexed(&self) -> impl Iterator<Item = &DocumentSchema> {
        self.iter().filter(|s| s.has_indexed_fields())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<DocumentSchema> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = DocumentSchema>>(iter: I) -> Self {
        let mut registry = Self::new();
        for schema in iter {
            registry.register(schema);
        }
        registry
    }
}
