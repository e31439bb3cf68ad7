//! Index definitions and schema fingerprints
//!
//! Turns an analyzed schema into the backend index schema plus a
//! deterministic fingerprint used to detect drift between the declared
//! fields and the index that exists in the store.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analyzer::{AnalyzedSchema, ResolvedField};
use crate::schema::ResolvedKind;

/// Deterministic digest of an ordered `(field, kind)` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of resolved fields in declaration order.
    ///
    /// Each field contributes its length-prefixed name followed by
    /// `:Kind;`. The prefix keeps names containing `:` or `;` from
    /// colliding with a different field set.
    pub fn of(fields: &[ResolvedField]) -> Self {
        let mut hasher = Sha256::new();
        for field in fields {
            hasher.update((field.name.len() as u64).to_le_bytes());
            hasher.update(field.name.as_bytes());
            hasher.update(b":");
            hasher.update(field.kind.as_str().as_bytes());
            hasher.update(b";");
        }
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    /// Wrap a fingerprint read back from the store.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Fingerprint(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend index schema for one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSchema {
    /// Index name
    pub index_name: String,
    /// Key prefix the index is bound to
    pub key_prefix: String,
    /// Field → schema kind, in declaration order
    pub fields: Vec<(String, ResolvedKind)>,
}

impl IndexSchema {
    /// Arguments following `FT.CREATE`.
    ///
    /// `<index> ON HASH PREFIX 1 <prefix> SCHEMA <field> <KIND> ...`
    pub fn create_args(&self) -> Vec<String> {
        let mut args = vec![
            self.index_name.clone(),
            "ON".to_string(),
            "HASH".to_string(),
            "PREFIX".to_string(),
            "1".to_string(),
            self.key_prefix.clone(),
            "SCHEMA".to_string(),
        ];
        for (name, kind) in &self.fields {
            args.push(name.clone());
            args.push(kind.schema_keyword().to_string());
        }
        args
    }
}

/// Index schema paired with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDefinition {
    pub schema: IndexSchema,
    pub fingerprint: Fingerprint,
}

/// Builds index definitions from analyzed schemas.
pub struct IndexDefinitionBuilder;

impl IndexDefinitionBuilder {
    /// Build the index definition for `analysis`.
    ///
    /// Returns `None` when the type declares no indexed fields, meaning no
    /// index action is required for it.
    pub fn build(analysis: &AnalyzedSchema) -> Option<IndexDefinition> {
        if !analysis.has_indexed_fields() {
            return None;
        }

        let schema = IndexSchema {
            index_name: analysis.index_name.clone(),
            key_prefix: analysis.key_prefix(),
            fields: analysis
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.kind))
                .collect(),
        };

        Some(IndexDefinition {
            schema,
            fingerprint: Fingerprint::of(&analysis.fields),
        })
    }
}
