//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{LayoutService, NodeService};
use crate::application::MindmapLocks;
use crate::config::Settings;
use crate::infrastructure::traits::NodeStore;
use crate::infrastructure::{InfraResult, SqliteNodeStore};

/// Container holding all application services.
///
/// Both services share one store and one lock registry, so a node mutation
/// and an explicit recompute of the same mindmap never interleave.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Node persistence
    pub store: Arc<dyn NodeStore>,

    pub layout: Arc<LayoutService>,

    pub nodes: NodeService,
}

impl ServiceContainer {
    /// Create a new service container backed by the configured SQLite database.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let store = SqliteNodeStore::open(&settings.database_path, settings.busy_timeout())?;
        debug!("using database {}", store.path().display());
        Ok(Self::with_store(settings, Arc::new(store)))
    }

    /// Create a service container with a custom store (for testing).
    pub fn with_store(settings: Settings, store: Arc<dyn NodeStore>) -> Self {
        let settings = Arc::new(settings);
        let locks = Arc::new(MindmapLocks::new());
        let layout = Arc::new(LayoutService::new(
            Arc::clone(&store),
            settings.layout,
            Arc::clone(&locks),
        ));
        let nodes = NodeService::new(Arc::clone(&store), Arc::clone(&layout), locks);

        Self {
            settings,
            store,
            layout,
            nodes,
        }
    }
}
