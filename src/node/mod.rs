pub mod config;
mod cron_routes;
mod crud_routes;
pub mod http_server;
mod schema_routes;

use std::sync::Arc;

use log::info;

pub use config::{ConfigError, NodeConfig};
pub use http_server::{AppState, RecordBaseHttpServer};

use crate::collections::{CollectionRegistry, GenericCrudService};
use crate::error::RecordBaseResult;
use crate::reconciler::SchemaReconciler;
use crate::schema::{SchemaCompiler, SchemaStore};

/// The construct-once service container for a RecordBase process.
///
/// Owns the sled database and every core service built on it. Request
/// handlers receive it through shared application state; there is no
/// ambient global state anywhere in the crate.
pub struct RecordBaseNode {
    config: NodeConfig,
    schema_store: Arc<SchemaStore>,
    registry: Arc<CollectionRegistry>,
    crud: Arc<GenericCrudService>,
    compiler: Arc<SchemaCompiler>,
    reconciler: Arc<SchemaReconciler>,
}

impl RecordBaseNode {
    pub fn new(config: NodeConfig) -> RecordBaseResult<Self> {
        config.validate()?;
        let db = sled::open(&config.storage_path)?;

        let schema_store = Arc::new(SchemaStore::new(&db)?);
        let registry = Arc::new(CollectionRegistry::new(db.clone()));
        let crud = Arc::new(GenericCrudService::new(
            schema_store.clone(),
            registry.clone(),
        ));
        let compiler = Arc::new(SchemaCompiler::new(schema_store.clone()));
        let reconciler = Arc::new(SchemaReconciler::new(
            compiler.clone(),
            &db,
            config.update_interval_secs,
        )?);

        info!(
            "RecordBase node initialized (storage: {})",
            config.storage_path.display()
        );

        Ok(Self {
            config,
            schema_store,
            registry,
            crud,
            compiler,
            reconciler,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn schema_store(&self) -> &Arc<SchemaStore> {
        &self.schema_store
    }

    pub fn registry(&self) -> &Arc<CollectionRegistry> {
        &self.registry
    }

    pub fn crud(&self) -> &Arc<GenericCrudService> {
        &self.crud
    }

    pub fn compiler(&self) -> &Arc<SchemaCompiler> {
        &self.compiler
    }

    pub fn reconciler(&self) -> &Arc<SchemaReconciler> {
        &self.reconciler
    }

    /// Stop background work before tearing the node down.
    pub async fn shutdown(&self) {
        self.reconciler.stop().await;
        info!("RecordBase node shut down");
    }
}
