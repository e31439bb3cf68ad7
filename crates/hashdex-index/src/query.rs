//! Native queries
//!
//! [`NativeQuery`] is a native query string bound to its target index, built
//! either from a compiled predicate or by hand with [`ClauseQuery`].

use std::fmt;

use serde::Serialize;

use crate::analyzer::AnalyzedSchema;
use crate::compiler::compile;
use crate::converter::{escape_tag, numeric_range, text_term, to_native};
use crate::error::{IndexError, Result};
use crate::predicate::Predicate;

/// Query string that matches every document.
pub const MATCH_ALL: &str = "*";

/// Highest fuzzy-match distance accepted by the search module.
pub const MAX_FUZZY_LEVEL: u8 = 3;

/// Parenthesize a fragment containing `|` so that juxtaposition ANDs it as a
/// whole.
fn group_disjunction(fragment: &str) -> String {
    if fragment.contains(" | ") {
        format!("({})", fragment)
    } else {
        fragment.to_string()
    }
}

/// Native query string plus the index it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeQuery {
    pub index_name: String,
    pub query: String,
}

impl NativeQuery {
    pub fn new(index_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            query: query.into(),
        }
    }

    /// Unfiltered query over `index_name`.
    pub fn all(index_name: impl Into<String>) -> Self {
        Self::new(index_name, "")
    }

    /// Compile and lower `predicate` against `schema`.
    pub fn from_predicate(schema: &AnalyzedSchema, predicate: &Predicate) -> Result<Self> {
        let compiled = compile(schema, predicate)?;
        Ok(Self::new(&schema.index_name, to_native(&compiled)?))
    }

    /// AND another native fragment onto this query.
    pub fn and(mut self, fragment: impl AsRef<str>) -> Self {
        let fragment = fragment.as_ref().trim();
        if fragment.is_empty() {
            return self;
        }
        if self.query.trim().is_empty() {
            self.query = fragment.to_string();
        } else {
            self.query = format!(
                "{} {}",
                group_disjunction(self.query.trim()),
                group_disjunction(fragment)
            );
        }
        self
    }

    /// AND a predicate onto this query.
    pub fn filter(self, schema: &AnalyzedSchema, predicate: &Predicate) -> Result<Self> {
        if schema.index_name != self.index_name {
            return Err(IndexError::unsupported(format!(
                "predicate for '{}' applied to a query over '{}'",
                schema.index_name, self.index_name
            )));
        }
        let compiled = compile(schema, predicate)?;
        Ok(self.and(to_native(&compiled)?))
    }

    /// Whether no filter has been applied.
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
    }

    /// Query string as sent to the store; empty becomes match-all.
    pub fn effective_query(&self) -> &str {
        if self.is_empty() {
            MATCH_ALL
        } else {
            self.query.trim()
        }
    }
}

impl fmt::Display for NativeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.index_name, self.effective_query())
    }
}

/// Hand-built native query, one clause at a time.
///
/// Clauses are space-joined (AND).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseQuery {
    clauses: Vec<String>,
}

impl ClauseQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full-text term, fuzzy-wrapped with `fuzzy` `%` on each side.
    pub fn text(mut self, field: &str, value: &str, fuzzy: u8) -> Result<Self> {
        if fuzzy > MAX_FUZZY_LEVEL {
            return Err(IndexError::unsupported(format!(
                "fuzzy level {} exceeds {}",
                fuzzy, MAX_FUZZY_LEVEL
            )));
        }
        let term = text_term(value).ok_or_else(|| {
            IndexError::unsupported(format!("text value '{}' has no searchable characters", value))
        })?;
        let pad = "%".repeat(fuzzy as usize);
        self.clauses
            .push(format!("@{}:{}{}{}", field, pad, term, pad));
        Ok(self)
    }

    /// Exact phrase match.
    pub fn text_exact(mut self, field: &str, value: &str) -> Self {
        let phrase = value.replace('"', "");
        self.clauses.push(format!("@{}:\"{}\"", field, phrase.trim()));
        self
    }

    /// Exact tag match.
    pub fn tag(mut self, field: &str, value: &str) -> Self {
        self.clauses
            .push(format!("@{}:{{{}}}", field, escape_tag(value)));
        self
    }

    /// Numeric range; open bounds become infinities.
    pub fn numeric(mut self, field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        let min = min.map_or_else(|| "-inf".to_string(), |v| v.to_string());
        let max = max.map_or_else(|| "+inf".to_string(), |v| v.to_string());
        self.clauses
            .push(format!("@{}:{}", field, numeric_range(&min, &max)));
        self
    }

    /// Disjunction of whole sub-queries.
    pub fn or(mut self, queries: Vec<ClauseQuery>) -> Result<Self> {
        let parts: Vec<String> = queries
            .iter()
            .filter(|q| !q.is_empty())
            .map(|q| q.render())
            .collect();
        if parts.is_empty() {
            return Err(IndexError::unsupported("OR of no sub-queries"));
        }
        self.clauses.push(format!("({})", parts.join(" | ")));
        Ok(self)
    }

    /// Negate the most recently added clause.
    pub fn not(mut self) -> Result<Self> {
        let last = self
            .clauses
            .pop()
            .ok_or_else(|| IndexError::unsupported("NOT with no preceding clause"))?;
        self.clauses.push(format!("-{}", last));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Space-joined native query string.
    pub fn render(&self) -> String {
        self.clauses.join(" ")
    }

    /// Bind this query to `index_name`.
    pub fn into_native(self, index_name: impl Into<String>) -> NativeQuery {
        NativeQuery::new(index_name, self.render())
    }
}

impl fmt::Display for ClauseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
