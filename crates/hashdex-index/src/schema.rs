//! Document schemas and field descriptors
//!
//! A [`DocumentSchema`] is the explicit, declared description of one stored
//! document type: its index name (also its key namespace) and the ordered
//! list of indexed fields. Schemas are built once per type, either through
//! [`DocumentSchema::builder`] or from the declarative `[[documents]]` table
//! in configuration.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use hashdex_config::{DocumentConfig, FieldKindSetting};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Declared index kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Resolve from the field's value type
    #[default]
    Auto,
    /// Exact-match tag field
    Tag,
    /// Full-text field
    Text,
    /// Numeric range field
    Numeric,
}

impl From<FieldKindSetting> for FieldKind {
    fn from(setting: FieldKindSetting) -> Self {
        match setting {
            FieldKindSetting::Auto => FieldKind::Auto,
            FieldKindSetting::Tag => FieldKind::Tag,
            FieldKindSetting::Text => FieldKind::Text,
            FieldKindSetting::Numeric => FieldKind::Numeric,
        }
    }
}

/// Concrete kind a field is indexed as, after resolving [`FieldKind::Auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedKind {
    Tag,
    Text,
    Numeric,
}

impl ResolvedKind {
    /// Schema clause keyword used by `FT.CREATE`.
    pub fn schema_keyword(self) -> &'static str {
        match self {
            ResolvedKind::Tag => "TAG",
            ResolvedKind::Text => "TEXT",
            ResolvedKind::Numeric => "NUMERIC",
        }
    }

    /// Stable name used in fingerprints and kind annotations.
    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedKind::Tag => "Tag",
            ResolvedKind::Text => "Text",
            ResolvedKind::Numeric => "Numeric",
        }
    }
}

impl fmt::Display for ResolvedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value type stored in a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    String,
    Bool,
    Timestamp,
    /// Any other serialized type (lists, enums, nested objects)
    Other(std::string::String),
}

impl ValueType {
    /// Whether values of this type are indexed as numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::I8
                | ValueType::I16
                | ValueType::I32
                | ValueType::I64
                | ValueType::U8
                | ValueType::U16
                | ValueType::U32
                | ValueType::U64
                | ValueType::F32
                | ValueType::F64
                | ValueType::Decimal
        )
    }

    /// Kind used when a field is declared [`FieldKind::Auto`].
    ///
    /// Numbers are numeric, strings are full text, everything else is a tag.
    pub fn auto_kind(&self) -> ResolvedKind {
        if self.is_numeric() {
            ResolvedKind::Numeric
        } else if *self == ValueType::String {
            ResolvedKind::Text
        } else {
            ResolvedKind::Tag
        }
    }
}

impl FromStr for ValueType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "i8" => ValueType::I8,
            "i16" => ValueType::I16,
            "i32" | "int" => ValueType::I32,
            "i64" | "long" | "isize" => ValueType::I64,
            "u8" | "byte" => ValueType::U8,
            "u16" => ValueType::U16,
            "u32" => ValueType::U32,
            "u64" | "usize" => ValueType::U64,
            "f32" | "float" => ValueType::F32,
            "f64" | "double" => ValueType::F64,
            "decimal" => ValueType::Decimal,
            "string" | "str" => ValueType::String,
            "bool" | "boolean" => ValueType::Bool,
            "timestamp" | "datetime" => ValueType::Timestamp,
            other => ValueType::Other(other.to_string()),
        })
    }
}

/// Rust types that can back an indexed field.
pub trait FieldValue {
    fn value_type() -> ValueType;
}

macro_rules! impl_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn value_type() -> ValueType {
                    ValueType::$variant
                }
            }
        )*
    };
}

impl_field_value! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    bool => Bool,
    DateTime<Utc> => Timestamp,
}

impl FieldValue for &str {
    fn value_type() -> ValueType {
        ValueType::String
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }
}

impl<T> FieldValue for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::Other("list".to_string())
    }
}

/// One declared indexed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Hash field name
    pub name: String,
    /// Declared kind
    pub kind: FieldKind,
    /// Value type, required to resolve [`FieldKind::Auto`]
    pub value_type: Option<ValueType>,
    /// Whether values must be unique across documents
    pub unique: bool,
}

impl FieldDescriptor {
    /// Descriptor for a field whose kind is resolved from `T`.
    pub fn auto<T: FieldValue>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Auto,
            value_type: Some(T::value_type()),
            unique: false,
        }
    }

    /// Descriptor with an explicit kind and no value type.
    pub fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value_type: None,
            unique: false,
        }
    }
}

/// Declared schema of one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl DocumentSchema {
    /// Start building a schema for the document type stored under `name`.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Build a schema from a declarative configuration entry.
    pub fn from_config(config: &DocumentConfig) -> Result<Self> {
        if config.name.is_empty() {
            return Err(IndexError::schema_config(
                "<unnamed>",
                "document type has no name",
            ));
        }

        let fields = config
            .fields
            .iter()
            .map(|field| FieldDescriptor {
                name: field.name.clone(),
                kind: field.kind.into(),
                value_type: field
                    .value_type
                    .as_deref()
                    .map(|v| match v.parse::<ValueType>() {
                        Ok(value_type) => value_type,
                        Err(never) => match never {},
                    }),
                unique: field.unique,
            })
            .collect();

        Ok(Self {
            name: config.name.clone(),
            fields,
        })
    }

    /// Index name, also the key namespace of the documents.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Whether any field is declared for indexing.
    pub fn has_indexed_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Key prefix scoping this type's documents (`<name>:`).
    pub fn key_prefix(&self) -> String {
        format!("{}:", self.name)
    }

    /// Store key of the document with the given id.
    pub fn document_key(&self, id: &str) -> String {
        format!("{}:{}", self.name, id)
    }
}

/// Builder for [`DocumentSchema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// Indexed field whose kind is resolved from `T`.
    pub fn field<T: FieldValue>(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor::auto::<T>(name));
        self
    }

    /// Indexed field with an explicit kind.
    pub fn field_as<T: FieldValue>(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor {
            kind,
            ..FieldDescriptor::auto::<T>(name)
        });
        self
    }

    /// Indexed field whose values must be unique across documents.
    pub fn unique<T: FieldValue>(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor {
            unique: true,
            ..FieldDescriptor::auto::<T>(name)
        });
        self
    }

    /// Append a prepared descriptor.
    pub fn descriptor(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    pub fn build(self) -> DocumentSchema {
        DocumentSchema {
            name: self.name,
            fields: self.fields,
        }
    }
}
