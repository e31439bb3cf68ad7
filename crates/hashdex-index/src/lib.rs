//! Hashdex Index - typed queries over Redis hashes with RediSearch
//!
//! This crate keeps a search index per document type in step with the
//! type's declared fields, and compiles typed predicates into native
//! search queries.
//!
//! # Features
//!
//! - **Schema fingerprints**: Indexes are rebuilt only when the declared
//!   `(field, kind)` sequence changes
//! - **Typed predicates**: Comparisons, string matching and boolean
//!   combinators over [`predicate::Field`] handles
//! - **Fail-soft queries**: Store failures at query time come back as
//!   [`QueryOutcome::Degraded`] instead of errors
//! - **Pluggable store**: [`RedisStore`] for a live server, [`MemoryStore`]
//!   for tests
//!
//! # Example
//!
//! ```ignore
//! use hashdex_index::{Hashdex, predicate::Field};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = hashdex_config::ConfigLoader::new();
//!     let config = loader.load(&std::env::current_dir()?, None)?;
//!     let client = Hashdex::connect(&config).await?;
//!
//!     let year = Field::<u32>::new("year");
//!     let cars = client.query::<Car>()?.filter(year.ge(2000u32))?.to_list().await;
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod client;
pub mod compiler;
pub mod converter;
pub mod definition;
pub mod document;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod predicate;
pub mod query;
pub mod record;
pub mod registry;
pub mod schema;
pub mod store;

// Re-exports for convenience
pub use analyzer::{analyze, AnalyzedSchema, ResolvedField, SchemaAnalyzer};
pub use client::Hashdex;
pub use compiler::{compile, CompiledPredicate, Token};
pub use converter::{escape_tag, to_native};
pub use definition::{Fingerprint, IndexDefinition, IndexDefinitionBuilder, IndexSchema};
pub use document::{Document, DocumentQuery, Page};
pub use error::{IndexError, Result};
pub use executor::{QueryExecutor, QueryOutcome, SearchPage, SelectPage, SelectRow};
pub use lifecycle::{IndexManager, IndexState, ReconcileReport, Reconciled};
pub use predicate::{CompareOp, Field, Literal, MatchMode, Operand, Predicate};
pub use query::{ClauseQuery, NativeQuery};
pub use record::IndexRecord;
pub use registry::SchemaRegistry;
pub use schema::{
    DocumentSchema, FieldDescriptor, FieldKind, FieldValue, ResolvedKind, SchemaBuilder, ValueType,
};
pub use store::{MemoryStore, RedisStore, Reply, SearchRequest, SearchStore, StoreOp};
