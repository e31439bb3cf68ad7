//! In-process store
//!
//! Keeps hashes and index schemas in memory and records every call, so the
//! lifecycle and executor can be exercised without a server. Search replies
//! are scripted by the caller.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Reply, SearchRequest, SearchStore};
use crate::definition::IndexSchema;
use crate::error::{IndexError, Result};

/// Store operation, used for call logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreateIndex,
    DropIndex,
    Search,
    HashGetAll,
    HashSet,
    HashIncr,
    Scan,
    Ping,
}

#[derive(Default)]
struct MemoryState {
    indexes: HashMap<String, IndexSchema>,
    hashes: BTreeMap<String, HashMap<String, String>>,
    calls: Vec<StoreOp>,
    searches: Vec<SearchRequest>,
    replies: VecDeque<Reply>,
    failing: Vec<StoreOp>,
    failing_indexes: Vec<String>,
}

/// In-memory [`SearchStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next search call.
    ///
    /// With no queued reply a search returns an empty result set.
    pub fn push_search_reply(&self, reply: Reply) {
        self.state.lock().replies.push_back(reply);
    }

    /// Make every subsequent call of `op` fail with a store error.
    pub fn fail_on(&self, op: StoreOp) {
        let mut state = self.state.lock();
        if !state.failing.contains(&op) {
            state.failing.push(op);
        }
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: StoreOp) {
        self.state.lock().failing.retain(|o| *o != op);
    }

    /// Make index creation fail for `index_name` only.
    pub fn fail_index(&self, index_name: impl Into<String>) {
        self.state.lock().failing_indexes.push(index_name.into());
    }

    pub fn recover_index(&self, index_name: &str) {
        self.state
            .lock()
            .failing_indexes
            .retain(|name| name != index_name);
    }

    /// Seed a hash directly, bypassing the call log.
    pub fn insert_hash(&self, key: impl Into<String>, fields: &[(&str, &str)]) {
        let entry = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.state.lock().hashes.insert(key.into(), entry);
    }

    /// Current contents of a hash.
    pub fn hash(&self, key: &str) -> Option<HashMap<String, String>> {
        self.state.lock().hashes.get(key).cloned()
    }

    /// Schema of a live index.
    pub fn index(&self, name: &str) -> Option<IndexSchema> {
        self.state.lock().indexes.get(name).cloned()
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state.lock().indexes.contains_key(name)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreOp> {
        self.state.lock().calls.clone()
    }

    /// Number of calls made for `op`.
    pub fn count(&self, op: StoreOp) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Every search request received, in order.
    pub fn searches(&self) -> Vec<SearchRequest> {
        self.state.lock().searches.clone()
    }

    pub fn last_search(&self) -> Option<SearchRequest> {
        self.state.lock().searches.last().cloned()
    }

    /// Forget the call log, keeping stored data.
    pub fn clear_calls(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.searches.clear();
    }

    /// Log `op` and fail if it is marked failing.
    fn record(&self, state: &mut MemoryState, op: StoreOp) -> Result<()> {
        state.calls.push(op);
        if state.failing.contains(&op) {
            return Err(IndexError::Store(format!("injected failure for {:?}", op)));
        }
        Ok(())
    }
}

/// Match a key against a scan pattern. Only trailing `*` is special.
fn matches_pattern(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn create_index(&self, schema: &IndexSchema) -> Result<()> {
        let mut state = self.state.lock();
        self.record(&mut state, StoreOp::CreateIndex)?;
        if state.failing_indexes.contains(&schema.index_name) {
            return Err(IndexError::Store(format!(
                "injected failure creating '{}'",
                schema.index_name
            )));
        }
        if state.indexes.contains_key(&schema.index_name) {
            return Err(IndexError::Store("Index already exists".to_string()));
        }
        state
            .indexes
            .insert(schema.index_name.clone(), schema.clone());
        Ok(())
    }

    async fn drop_index(&self, index_name: &str) -> Result<bool> {
        let mut state = self.state.lock();
        self.record(&mut state, StoreOp::DropIndex)?;
        Ok(state.indexes.remove(index_name).is_some())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Reply> {
        let mut state = self.state.lock();
        self.record(&mut state, StoreOp::Search)?;
        state.searches.push(request.clone());
        Ok(state
            .replies
            .pop_front()
            .unwrap_or_else(|| Reply::Array(vec![Reply::Int(0)])))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut state = self.state.lock();
        self.record(&mut state, StoreOp::HashGetAll)?;
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        let mut state = self.state.lock();
        self.record(&mut state, StoreOp::HashSet)?;
        let entry = state.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            entry.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let mut state = self.state.lock();
        self.record(&mut state, StoreOp::HashIncr)?;
        let entry = state.hashes.entry(key.to_string()).or_default();
        let current = match entry.get(field) {
            Some(value) => value.parse::<i64>().map_err(|_| {
                IndexError::Store("hash value is not an integer".to_string())
            })?,
            None => 0,
        };
        let next = current + delta;
        entry.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: u32) -> Result<(u64, Vec<String>)> {
        let mut state = self.state.lock();
        self.record(&mut state, StoreOp::Scan)?;

        let matching: Vec<&String> = state
            .hashes
            .keys()
            .filter(|k| matches_pattern(pattern, k))
            .collect();

        let start = cursor as usize;
        let end = (start + count.max(1) as usize).min(matching.len());
        let keys = matching
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|k| k.to_string())
            .collect();
        let next = if end >= matching.len() { 0 } else { end as u64 };

        Ok((next, keys))
    }

    async fn ping(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.record(&mut state, StoreOp::Ping)
    }
}
