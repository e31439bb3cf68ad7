//! Typed document layer
//!
//! A [`Document`] type names its static schema and knows how to stand up an
//! instance from a bare id. [`DocumentQuery`] chains typed predicates over it
//! and materializes pages of instances.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use crate::analyzer::AnalyzedSchema;
use crate::error::Result;
use crate::executor::{QueryExecutor, QueryOutcome, SelectPage};
use crate::predicate::Predicate;
use crate::query::NativeQuery;
use crate::schema::DocumentSchema;

/// A stored entity kind with a static schema.
///
/// ```
/// use hashdex_index::{Document, DocumentSchema};
/// use once_cell::sync::Lazy;
///
/// struct Car {
///     id: String,
/// }
///
/// static CAR_SCHEMA: Lazy<DocumentSchema> = Lazy::new(|| {
///     DocumentSchema::builder("cars")
///         .field::<String>("make")
///         .field::<u32>("year")
///         .build()
/// });
///
/// impl Document for Car {
///     fn schema() -> &'static DocumentSchema {
///         &CAR_SCHEMA
///     }
///
///     fn from_id(id: String) -> Self {
///         Car { id }
///     }
/// }
/// # let car = Car::from_id("1".to_string());
/// # assert_eq!(car.id, "1");
/// ```
pub trait Document: Sized {
    fn schema() -> &'static DocumentSchema;

    /// Instance standing for the stored document `id`.
    fn from_id(id: String) -> Self;
}

/// One page of typed documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<D> {
    pub items: Vec<D>,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<D> Default for Page<D> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            total_pages: 0,
        }
    }
}

/// Query over documents of type `D`.
pub struct DocumentQuery<'a, D> {
    executor: &'a QueryExecutor,
    analysis: Arc<AnalyzedSchema>,
    query: NativeQuery,
    _document: PhantomData<fn() -> D>,
}

impl<'a, D: Document> DocumentQuery<'a, D> {
    pub fn new(executor: &'a QueryExecutor, analysis: Arc<AnalyzedSchema>) -> Self {
        let query = NativeQuery::all(&analysis.index_name);
        Self {
            executor,
            analysis,
            query,
            _document: PhantomData,
        }
    }

    /// AND `predicate` onto the query.
    ///
    /// Compilation errors surface here, before any store call.
    pub fn filter(mut self, predicate: Predicate) -> Result<Self> {
        self.query = self.query.filter(&self.analysis, &predicate)?;
        Ok(self)
    }

    pub fn native(&self) -> &NativeQuery {
        &self.query
    }

    /// One page of documents. `page` is 1-based.
    pub async fn to_page(&self, page: u32, page_size: u32) -> QueryOutcome<Page<D>> {
        self.executor
            .search(&self.query, page, page_size)
            .await
            .map(|result| Page {
                items: result.ids.into_iter().map(D::from_id).collect(),
                total_count: result.total_count,
                total_pages: result.total_pages,
            })
    }

    /// First page at the default page size.
    pub async fn to_list(&self) -> QueryOutcome<Vec<D>> {
        self.to_page(1, self.executor.default_page_size())
            .await
            .map(|page| page.items)
    }

    pub async fn any(&self) -> QueryOutcome<bool> {
        self.executor.any(&self.query).await
    }

    pub async fn count(&self) -> QueryOutcome<u64> {
        self.executor.count(&self.query).await
    }

    /// Requested fields of each match on one page.
    pub async fn select(
        &self,
        fields: &[String],
        page: u32,
        page_size: u32,
    ) -> QueryOutcome<SelectPage> {
        self.executor
            .select(&self.query, fields, page, page_size)
            .await
    }
}
