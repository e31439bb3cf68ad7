//! Query execution
//!
//! Runs native queries, parses replies back into document ids and bumps the
//! per-index query counter.
//!
//! Execution fails soft: a store error or an unparseable reply is logged and
//! surfaces as [`QueryOutcome::Degraded`], which callers that only want data
//! collapse to an empty result with zero counts. Predicate compilation
//! errors happen earlier, while building the [`NativeQuery`], and are never
//! softened.

use std::collections::HashMap;
use std::sync::Arc;

use hashdex_config::HashdexConfig;
use serde::Serialize;
use tracing::{debug, warn};

use crate::analyzer::AnalyzedSchema;
use crate::converter::{escape_tag, numeric_range};
use crate::error::{IndexError, Result};
use crate::query::{ClauseQuery, NativeQuery};
use crate::record::{self, IndexRecord};
use crate::schema::{DocumentSchema, ResolvedKind};
use crate::store::{Reply, SearchRequest, SearchStore};

/// Result of a fail-soft query operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum QueryOutcome<T> {
    /// The store answered and the reply was understood
    Complete(T),
    /// The query could not be served; `reason` says why
    Degraded { reason: String },
}

impl<T> QueryOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, QueryOutcome::Degraded { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            QueryOutcome::Complete(value) => Some(value),
            QueryOutcome::Degraded { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryOutcome<U> {
        match self {
            QueryOutcome::Complete(value) => QueryOutcome::Complete(f(value)),
            QueryOutcome::Degraded { reason } => QueryOutcome::Degraded { reason },
        }
    }
}

impl<T: Default> QueryOutcome<T> {
    /// The value, or the empty default for a degraded outcome.
    pub fn into_value(self) -> T {
        match self {
            QueryOutcome::Complete(value) => value,
            QueryOutcome::Degraded { .. } => T::default(),
        }
    }
}

/// One page of matching document ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    pub ids: Vec<String>,
    pub total_count: u64,
    pub total_pages: u64,
}

/// One matched document in projection mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectRow {
    pub id: String,
    pub values: HashMap<String, String>,
}

/// One page of projected documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectPage {
    pub rows: Vec<SelectRow>,
    pub total_count: u64,
    pub total_pages: u64,
}

/// Pages needed to hold `total` results.
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    let size = u64::from(page_size.max(1));
    total.div_ceil(size)
}

/// Runs native queries against a [`SearchStore`].
pub struct QueryExecutor {
    store: Arc<dyn SearchStore>,
    record_prefix: String,
    default_page_size: u32,
    max_page_size: u32,
    scan_batch_size: u32,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn SearchStore>) -> Self {
        Self::with_config(store, &HashdexConfig::default())
    }

    /// Executor using the `[query]`, `[index]` and `[store]` settings.
    pub fn with_config(store: Arc<dyn SearchStore>, config: &HashdexConfig) -> Self {
        Self {
            store,
            record_prefix: record::resolve_prefix(&config.index.record_prefix),
            default_page_size: config.query.default_page_size.max(1),
            max_page_size: config.query.max_page_size.max(1),
            scan_batch_size: config.store.scan_batch_size.max(1),
        }
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    fn window(&self, page: u32, page_size: u32) -> (u32, u64) {
        let size = page_size.clamp(1, self.max_page_size);
        let offset = u64::from(page.max(1) - 1) * u64::from(size);
        (size, offset)
    }

    /// Send `request` and parse the reply with `parse`.
    ///
    /// The query counter only moves once the reply has been understood.
    async fn run<T>(
        &self,
        request: &SearchRequest,
        parse: impl FnOnce(&[Reply]) -> Result<T>,
    ) -> Result<T> {
        let items = match self.store.search(request).await? {
            Reply::Array(items) => items,
            other => {
                return Err(IndexError::invalid_response(format!(
                    "expected an array from search, got {:?}",
                    other
                )))
            }
        };
        let parsed = parse(&items)?;
        self.bump_counter(&request.index_name).await;
        Ok(parsed)
    }

    /// Best-effort usage counter update.
    async fn bump_counter(&self, index_name: &str) {
        if let Err(e) =
            IndexRecord::increment_queries(self.store.as_ref(), &self.record_prefix, index_name)
                .await
        {
            warn!("Failed to update query counter for '{}': {}", index_name, e);
        }
    }

    fn degraded<T>(query: &NativeQuery, err: IndexError) -> QueryOutcome<T> {
        warn!("Query on '{}' degraded to no results: {}", query.index_name, err);
        QueryOutcome::Degraded {
            reason: err.to_string(),
        }
    }

    /// One page of matching ids. `page` is 1-based.
    pub async fn search(
        &self,
        query: &NativeQuery,
        page: u32,
        page_size: u32,
    ) -> QueryOutcome<SearchPage> {
        let (size, offset) = self.window(page, page_size);
        let request = SearchRequest::ids(
            &query.index_name,
            query.effective_query(),
            offset,
            u64::from(size),
        );
        debug!("Searching '{}' for '{}'", query.index_name, request.query);

        let parsed = self
            .run(&request, |items| parse_ids(&query.index_name, items))
            .await;
        match parsed {
            Ok((total_count, ids)) => QueryOutcome::Complete(SearchPage {
                ids,
                total_count,
                total_pages: total_pages(total_count, size),
            }),
            Err(e) => Self::degraded(query, e),
        }
    }

    /// One page of matches with the requested fields of each.
    pub async fn select(
        &self,
        query: &NativeQuery,
        fields: &[String],
        page: u32,
        page_size: u32,
    ) -> QueryOutcome<SelectPage> {
        let (size, offset) = self.window(page, page_size);
        let request = SearchRequest::projection(
            &query.index_name,
            query.effective_query(),
            fields.to_vec(),
            offset,
            u64::from(size),
        );
        debug!(
            "Selecting {:?} from '{}' for '{}'",
            fields, query.index_name, request.query
        );

        let parsed = self
            .run(&request, |items| parse_rows(&query.index_name, items))
            .await;
        match parsed {
            Ok((total_count, rows)) => QueryOutcome::Complete(SelectPage {
                rows,
                total_count,
                total_pages: total_pages(total_count, size),
            }),
            Err(e) => Self::degraded(query, e),
        }
    }

    /// Whether anything matches. An unfiltered query answers `false`
    /// without asking the store.
    pub async fn any(&self, query: &NativeQuery) -> QueryOutcome<bool> {
        if query.is_empty() {
            return QueryOutcome::Complete(false);
        }
        self.search(query, 1, 1)
            .await
            .map(|page| page.total_count > 0)
    }

    /// Number of matching documents.
    pub async fn count(&self, query: &NativeQuery) -> QueryOutcome<u64> {
        let request = SearchRequest::ids(&query.index_name, query.effective_query(), 0, 0);
        let parsed = self.run(&request, parse_total).await;
        match parsed {
            Ok(total) => QueryOutcome::Complete(total),
            Err(e) => Self::degraded(query, e),
        }
    }

    /// Whether some document already holds `value` in `field`.
    ///
    /// Fails if `field` is not indexed by `schema`.
    pub async fn is_value_taken(
        &self,
        schema: &AnalyzedSchema,
        field: &str,
        value: &str,
    ) -> Result<QueryOutcome<bool>> {
        let kind = schema
            .kind_of(field)
            .ok_or_else(|| IndexError::unknown_field(&schema.index_name, field))?;

        let clause = match kind {
            ResolvedKind::Tag => format!("@{}:{{{}}}", field, escape_tag(value)),
            ResolvedKind::Text => ClauseQuery::new().text_exact(field, value).render(),
            ResolvedKind::Numeric => {
                let number: f64 = value.trim().parse().map_err(|_| {
                    IndexError::unsupported(format!(
                        "value '{}' for numeric field '{}' is not a number",
                        value, field
                    ))
                })?;
                let bound = number.to_string();
                format!("@{}:{}", field, numeric_range(&bound, &bound))
            }
        };

        Ok(self
            .any(&NativeQuery::new(&schema.index_name, clause))
            .await)
    }

    /// Ids of every stored document of `schema`, by key scan.
    ///
    /// Keys with further `:` segments below the prefix belong to nested
    /// data and are skipped.
    pub async fn list_ids(&self, schema: &DocumentSchema) -> QueryOutcome<Vec<String>> {
        let prefix = schema.key_prefix();
        let pattern = format!("{}*", prefix);
        let mut ids = Vec::new();
        let mut cursor = 0u64;

        loop {
            match self.store.scan(cursor, &pattern, self.scan_batch_size).await {
                Ok((next, keys)) => {
                    ids.extend(
                        keys.iter()
                            .filter_map(|k| k.strip_prefix(&prefix))
                            .filter(|id| !id.is_empty() && !id.contains(':'))
                            .map(str::to_string),
                    );
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Err(e) => {
                    warn!("Key scan of '{}' degraded: {}", pattern, e);
                    return QueryOutcome::Degraded {
                        reason: e.to_string(),
                    };
                }
            }
        }

        ids.sort();
        ids.dedup();
        QueryOutcome::Complete(ids)
    }
}

fn parse_total(items: &[Reply]) -> Result<u64> {
    let total = items
        .first()
        .and_then(Reply::as_int)
        .ok_or_else(|| IndexError::invalid_response("search reply has no total count"))?;
    u64::try_from(total)
        .map_err(|_| IndexError::invalid_response(format!("negative total count {}", total)))
}

/// Strip the `<index>:` key prefix from a returned key.
fn document_id(index_name: &str, key: &str) -> String {
    key.strip_prefix(index_name)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(key)
        .to_string()
}

fn parse_ids(index_name: &str, items: &[Reply]) -> Result<(u64, Vec<String>)> {
    let total = parse_total(items)?;
    let ids = items[1..]
        .iter()
        .map(|item| {
            item.as_str()
                .map(|key| document_id(index_name, key))
                .ok_or_else(|| {
                    IndexError::invalid_response(format!("expected a document key, got {:?}", item))
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((total, ids))
}

fn parse_rows(index_name: &str, items: &[Reply]) -> Result<(u64, Vec<SelectRow>)> {
    let total = parse_total(items)?;
    let mut rows = Vec::new();
    let mut rest = items[1..].iter();

    while let Some(key) = rest.next() {
        let key = key.as_str().ok_or_else(|| {
            IndexError::invalid_response(format!("expected a document key, got {:?}", key))
        })?;

        let mut values = HashMap::new();
        match rest.next() {
            Some(Reply::Array(pairs)) => {
                for pair in pairs.chunks(2) {
                    if let [name, value] = pair {
                        if let (Some(name), Some(value)) = (name.as_str(), value.as_str()) {
                            values.insert(name.to_string(), value.to_string());
                        }
                    }
                }
            }
            // Documents missing every requested field come back with no array
            Some(Reply::Nil) | None => {}
            Some(other) => {
                return Err(IndexError::invalid_response(format!(
                    "expected a field array, got {:?}",
                    other
                )))
            }
        }

        rows.push(SelectRow {
            id: document_id(index_name, key),
            values,
        });
    }

    Ok((total, rows))
}
