//! Schema analysis
//!
//! Resolves every declared field of a [`DocumentSchema`] to a concrete
//! [`ResolvedKind`]. Analysis is pure; [`SchemaAnalyzer`] memoizes it per
//! document-type name.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::schema::{DocumentSchema, FieldDescriptor, FieldKind, ResolvedKind};

/// A field with its kind resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub name: String,
    pub kind: ResolvedKind,
    pub unique: bool,
}

/// Result of analyzing a document schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzedSchema {
    /// Index name (also the key namespace)
    pub index_name: String,
    /// Resolved fields in declaration order
    pub fields: Vec<ResolvedField>,
}

impl AnalyzedSchema {
    /// Look up a resolved field by name.
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolved kind of the named field, if it is indexed.
    pub fn kind_of(&self, name: &str) -> Option<ResolvedKind> {
        self.field(name).map(|f| f.kind)
    }

    /// Key prefix scoping this type's documents.
    pub fn key_prefix(&self) -> String {
        format!("{}:", self.index_name)
    }

    pub fn has_indexed_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Resolve a single descriptor.
fn resolve_field(index: &str, descriptor: &FieldDescriptor) -> Result<ResolvedField> {
    if descriptor.name.is_empty() {
        return Err(IndexError::schema_config(index, "field with an empty name"));
    }

    let kind = match descriptor.kind {
        FieldKind::Tag => ResolvedKind::Tag,
        FieldKind::Text => ResolvedKind::Text,
        FieldKind::Numeric => ResolvedKind::Numeric,
        FieldKind::Auto => match descriptor.value_type {
            Some(ref value_type) => value_type.auto_kind(),
            None => {
                let role = if descriptor.unique { "unique" } else { "indexed" };
                return Err(IndexError::schema_config(
                    index,
                    format!(
                        "{} field '{}' is declared auto but has no value type to resolve its kind",
                        role, descriptor.name
                    ),
                ));
            }
        },
    };

    Ok(ResolvedField {
        name: descriptor.name.clone(),
        kind,
        unique: descriptor.unique,
    })
}

/// Analyze a schema, resolving every `Auto` kind.
///
/// Performs no I/O and is deterministic.
pub fn analyze(schema: &DocumentSchema) -> Result<AnalyzedSchema> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(schema.fields().len());

    for descriptor in schema.fields() {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(IndexError::schema_config(
                schema.name(),
                format!("field '{}' is declared more than once", descriptor.name),
            ));
        }
        fields.push(resolve_field(schema.name(), descriptor)?);
    }

    Ok(AnalyzedSchema {
        index_name: schema.name().to_string(),
        fields,
    })
}

struct CachedAnalysis {
    source: Vec<FieldDescriptor>,
    analysis: Arc<AnalyzedSchema>,
}

/// Per-document-type memo of schema analyses.
///
/// A cached entry is reused only while the declared descriptors are the same;
/// a changed declaration under the same name is re-analyzed and replaces it.
#[derive(Default)]
pub struct SchemaAnalyzer {
    cache: Mutex<HashMap<String, CachedAnalysis>>,
}

impl SchemaAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze `schema`, returning the cached result when available.
    pub fn analyze(&self, schema: &DocumentSchema) -> Result<Arc<AnalyzedSchema>> {
        if let Some(cached) = self.cache.lock().get(schema.name()) {
            if cached.source == schema.fields() {
                return Ok(Arc::clone(&cached.analysis));
            }
            debug!("Schema for '{}' changed, re-analyzing", schema.name());
        }

        let analysis = Arc::new(analyze(schema)?);
        self.cache.lock().insert(
            schema.name().to_string(),
            CachedAnalysis {
                source: schema.fields().to_vec(),
                analysis: Arc::clone(&analysis),
            },
        );

        Ok(analysis)
    }

    /// Number of cached document types.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Drop every cached analysis.
    pub fn reset(&self) {
        self.cache.lock().clear();
    }
}
