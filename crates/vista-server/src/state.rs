//! Shared application state.

use std::sync::Arc;
use vista_core::{GrantsConfig, QueryConfig, VistaConfig};
use vista_policy::{AccessGate, GrantStore, StaticGrantStore};
use vista_query::{
    ColumnCatalog, ConnectionRegistry, ExportStreamer, PgCatalog, PgGrantStore, QueryError,
    QueryExecutor, QueryPlanner,
};

/// Everything a handler needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub gate: Arc<AccessGate>,
    pub planner: Arc<QueryPlanner>,
    pub executor: Arc<QueryExecutor>,
    pub streamer: Arc<ExportStreamer>,
    pub query: QueryConfig,
}

impl AppState {
    /// Wire the services together. Connects nothing; pools open on first use.
    pub fn from_config(config: &VistaConfig) -> Result<Self, QueryError> {
        let registry = Arc::new(ConnectionRegistry::from_config(config));

        let grants: Arc<dyn GrantStore> = match &config.grants {
            GrantsConfig::Static { principals } => {
                Arc::new(StaticGrantStore::from_entries(principals))
            }
            GrantsConfig::Database(table) => Arc::new(PgGrantStore::new(registry.clone(), table)?),
        };
        let gate = AccessGate::new(grants, config.export.clone());
        let catalog = Arc::new(PgCatalog::new(registry.clone()));

        Ok(Self::new(registry, gate, catalog, config.query.clone()))
    }

    pub fn new(
        registry: Arc<ConnectionRegistry>,
        gate: AccessGate,
        catalog: Arc<dyn ColumnCatalog>,
        query: QueryConfig,
    ) -> Self {
        let executor = Arc::new(QueryExecutor::new(registry.clone()));
        let streamer = Arc::new(ExportStreamer::new(
            executor.clone(),
            query.export_batch_size,
        ));
        Self {
            registry,
            gate: Arc::new(gate),
            planner: Arc::new(QueryPlanner::new(catalog)),
            executor,
            streamer,
            query,
        }
    }
}
