//! Store abstraction
//!
//! [`SearchStore`] is the narrow protocol surface the index lifecycle and the
//! query executor need from the backend. [`RedisStore`] talks to a Redis
//! server with the search module loaded; [`MemoryStore`] is an in-process
//! stand-in that records every call.

mod memory;
mod redis_store;

pub use self::memory::{MemoryStore, StoreOp};
pub use self::redis_store::RedisStore;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::definition::IndexSchema;
use crate::error::Result;

/// Backend reply, decoupled from the client library's value type.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Int(i64),
    Data(String),
    Array(Vec<Reply>),
}

impl Reply {
    /// Integer value, accepting numeric strings.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Reply::Int(n) => Some(*n),
            Reply::Data(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String value of a scalar reply.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Reply::Data(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Arguments of one `FT.SEARCH` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub index_name: String,
    pub query: String,
    /// Return identifiers only
    pub no_content: bool,
    /// Restrict returned fields (projection mode)
    pub return_fields: Vec<String>,
    pub offset: u64,
    pub count: u64,
}

impl SearchRequest {
    /// Identifier-only search.
    pub fn ids(
        index_name: impl Into<String>,
        query: impl Into<String>,
        offset: u64,
        count: u64,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            query: query.into(),
            no_content: true,
            return_fields: Vec::new(),
            offset,
            count,
        }
    }

    /// Projection search returning the listed fields.
    pub fn projection(
        index_name: impl Into<String>,
        query: impl Into<String>,
        fields: Vec<String>,
        offset: u64,
        count: u64,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            query: query.into(),
            no_content: false,
            return_fields: fields,
            offset,
            count,
        }
    }

    /// Arguments following `FT.SEARCH`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.index_name.clone(), self.query.clone()];
        if self.no_content {
            args.push("NOCONTENT".to_string());
        }
        if !self.return_fields.is_empty() {
            args.push("RETURN".to_string());
            args.push(self.return_fields.len().to_string());
            args.extend(self.return_fields.iter().cloned());
        }
        args.push("LIMIT".to_string());
        args.push(self.offset.to_string());
        args.push(self.count.to_string());
        args
    }
}

/// Backend operations used by this crate.
///
/// All operations are single request/response round trips.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Create a search index over hashes under the schema's key prefix.
    async fn create_index(&self, schema: &IndexSchema) -> Result<()>;

    /// Drop a search index, keeping the documents.
    ///
    /// Returns `false` when the index did not exist.
    async fn drop_index(&self, index_name: &str) -> Result<bool>;

    /// Run a search and return the raw reply.
    async fn search(&self, request: &SearchRequest) -> Result<Reply>;

    /// Read every field of a hash. Missing keys yield an empty map.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Set fields of a hash.
    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<()>;

    /// Increment an integer hash field, returning the new value.
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64>;

    /// One cursor step of a key scan. A returned cursor of 0 ends the scan.
    async fn scan(&self, cursor: u64, pattern: &str, count: u32) -> Result<(u64, Vec<String>)>;

    /// Round-trip health check.
    async fn ping(&self) -> Result<()>;
}
