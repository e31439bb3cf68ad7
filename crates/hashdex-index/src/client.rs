//! Hashdex client
//!
//! Ties the store, the index lifecycle and the query executor together
//! behind one handle built from configuration.

use std::sync::Arc;

use hashdex_config::{ConfigError, HashdexConfig};
use tracing::info;

use crate::document::{Document, DocumentQuery};
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::lifecycle::{IndexManager, ReconcileReport, Reconciled};
use crate::registry::SchemaRegistry;
use crate::schema::DocumentSchema;
use crate::store::{RedisStore, SearchStore};

/// Connected client over one store.
pub struct Hashdex {
    store: Arc<dyn SearchStore>,
    manager: IndexManager,
    executor: QueryExecutor,
    registry: SchemaRegistry,
    config: HashdexConfig,
}

impl Hashdex {
    /// Connect to Redis and register the configured document types.
    ///
    /// Indexes are reconciled right away when `[index].reconcile_on_start`
    /// is set. A type that fails to reconcile is logged and left stale.
    pub async fn connect(config: &HashdexConfig) -> Result<Self> {
        let store = RedisStore::connect(&config.store).await?;
        let client = Self::with_store(Arc::new(store), config)?;

        if config.index.reconcile_on_start {
            client.ensure_indexes().await;
        }
        Ok(client)
    }

    /// Build a client over an existing store without touching it.
    pub fn with_store(store: Arc<dyn SearchStore>, config: &HashdexConfig) -> Result<Self> {
        config.validate()?;

        let registry = SchemaRegistry::from_config(config)?;
        info!(
            "Hashdex client ready with {} document types",
            registry.len()
        );

        Ok(Self {
            manager: IndexManager::with_record_prefix(
                Arc::clone(&store),
                &config.index.record_prefix,
            ),
            executor: QueryExecutor::with_config(Arc::clone(&store), config),
            store,
            registry,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &HashdexConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SearchStore> {
        &self.store
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Register a document type declared in code.
    pub fn register(&mut self, schema: DocumentSchema) {
        self.registry.register(schema);
    }

    /// Register `D`'s schema.
    pub fn register_document<D: Document>(&mut self) {
        self.register(D::schema().clone());
    }

    /// Look up a registered schema.
    pub fn schema(&self, name: &str) -> Result<&DocumentSchema> {
        self.registry
            .get(name)
            .ok_or_else(|| ConfigError::document_not_found(name).into())
    }

    /// Reconcile every registered type.
    pub async fn ensure_indexes(&self) -> ReconcileReport {
        self.manager.ensure_all(&self.registry).await
    }

    /// Reconcile the index of `D`.
    pub async fn ensure<D: Document>(&self) -> Result<Reconciled> {
        self.manager.ensure_index(D::schema()).await
    }

    /// Start a query over documents of type `D`.
    pub fn query<D: Document>(&self) -> Result<DocumentQuery<'_, D>> {
        let analysis = self.manager.analyzer().analyze(D::schema())?;
        Ok(DocumentQuery::new(&self.executor, analysis))
    }
}
