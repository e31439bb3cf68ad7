//! Common test utilities for hashdex-index integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use hashdex_index::{
    DocumentSchema, FieldKind, IndexManager, MemoryStore, QueryExecutor, Reply,
};

/// Schema used across tests: a numeric, a tag and a text field.
pub fn people_schema() -> DocumentSchema {
    DocumentSchema::builder("people")
        .field::<i32>("age")
        .field_as::<String>("status", FieldKind::Tag)
        .field::<String>("bio")
        .build()
}

/// The people schema with one more field.
pub fn people_schema_extended() -> DocumentSchema {
    DocumentSchema::builder("people")
        .field::<i32>("age")
        .field_as::<String>("status", FieldKind::Tag)
        .field::<String>("bio")
        .field::<f64>("score")
        .build()
}

/// Fresh in-memory store plus a manager over it.
pub fn manager() -> (Arc<MemoryStore>, IndexManager) {
    let store = Arc::new(MemoryStore::new());
    let manager = IndexManager::new(store.clone());
    (store, manager)
}

/// Fresh in-memory store plus an executor over it.
pub fn executor() -> (Arc<MemoryStore>, QueryExecutor) {
    let store = Arc::new(MemoryStore::new());
    let executor = QueryExecutor::new(store.clone());
    (store, executor)
}

/// Identifier-only search reply.
pub fn ids_reply(total: i64, keys: &[&str]) -> Reply {
    let mut items = vec![Reply::Int(total)];
    items.extend(keys.iter().map(|k| Reply::Data(k.to_string())));
    Reply::Array(items)
}
