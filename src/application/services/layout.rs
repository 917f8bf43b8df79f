//! Layout service
//!
//! Runs the load → compute → write cycle for one mindmap inside a single
//! store transaction.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, MindmapLocks, StoreResultExt};
use crate::domain::{self, build_tree, LayoutConfig, LayoutMap, LoadedTree, MindmapId};
use crate::infrastructure::traits::{NodeStore, NodeTransaction};

/// Outcome of a committed layout run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSummary {
    pub mindmap_id: MindmapId,
    /// Number of nodes whose position was written
    pub positioned: usize,
}

/// Service recomputing and persisting mindmap layouts.
pub struct LayoutService {
    store: Arc<dyn NodeStore>,
    config: LayoutConfig,
    locks: Arc<MindmapLocks>,
}

impl LayoutService {
    /// Create a new layout service.
    pub fn new(store: Arc<dyn NodeStore>, config: LayoutConfig, locks: Arc<MindmapLocks>) -> Self {
        Self {
            store,
            config,
            locks,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Read every node of the mindmap and rebuild its hierarchy.
    ///
    /// Returns [`LoadedTree::Empty`] for a mindmap without nodes and a domain
    /// error for any integrity violation.
    pub fn load_tree(
        &self,
        tx: &mut dyn NodeTransaction,
        mindmap_id: MindmapId,
    ) -> ApplicationResult<LoadedTree> {
        let nodes = tx
            .fetch_nodes(mindmap_id)
            .with_store_context(&format!("fetch nodes of mindmap {mindmap_id}"))?;
        Ok(build_tree(mindmap_id, nodes)?)
    }

    pub fn compute_layout(&self, tree: &LoadedTree) -> LayoutMap {
        domain::compute_layout(tree, &self.config)
    }

    /// Write `positions` through `tx` without committing.
    pub fn apply_layout(
        &self,
        tx: &mut dyn NodeTransaction,
        positions: &LayoutMap,
    ) -> ApplicationResult<()> {
        if positions.is_empty() {
            return Ok(());
        }
        let updated = tx
            .batch_update_positions(positions)
            .with_store_context("write node positions")?;
        if updated != positions.len() {
            warn!(
                "layout covered {} nodes but {} rows were updated",
                positions.len(),
                updated
            );
        }
        debug!("applied {} positions", updated);
        Ok(())
    }

    /// Full re-layout inside a transaction owned by the caller.
    ///
    /// Any failure is reported as [`ApplicationError::LayoutFailed`]; the
    /// caller must then drop the transaction.
    pub fn relayout_in(
        &self,
        tx: &mut dyn NodeTransaction,
        mindmap_id: MindmapId,
    ) -> ApplicationResult<LayoutMap> {
        self.run_layout(tx, mindmap_id).map_err(|e| {
            warn!("layout of mindmap {} failed: {}", mindmap_id, e);
            ApplicationError::layout_failed(mindmap_id, e)
        })
    }

    fn run_layout(
        &self,
        tx: &mut dyn NodeTransaction,
        mindmap_id: MindmapId,
    ) -> ApplicationResult<LayoutMap> {
        self.config.validate()?;
        let tree = self.load_tree(tx, mindmap_id)?;
        let positions = self.compute_layout(&tree);
        self.apply_layout(tx, &positions)?;
        Ok(positions)
    }

    /// Recompute and persist the layout of a mindmap from its current nodes.
    #[instrument(skip(self))]
    pub fn recompute_layout(&self, mindmap_id: MindmapId) -> ApplicationResult<LayoutSummary> {
        self.locks.with_lock(mindmap_id, || {
            let mut tx = self.store.begin().with_store_context("begin transaction")?;
            let positions = self.relayout_in(tx.as_mut(), mindmap_id)?;
            tx.commit().with_store_context("commit layout")?;
            info!("mindmap {}: positioned {} nodes", mindmap_id, positions.len());
            Ok(LayoutSummary {
                mindmap_id,
                positioned: positions.len(),
            })
        })
    }

    /// Compute the layout a recompute would write, without writing it.
    #[instrument(skip(self))]
    pub fn preview_layout(&self, mindmap_id: MindmapId) -> ApplicationResult<LayoutMap> {
        self.config.validate()?;
        let mut tx = self
            .store
            .begin_read()
            .with_store_context("begin read transaction")?;
        let tree = self.load_tree(tx.as_mut(), mindmap_id)?;
        Ok(self.compute_layout(&tree))
    }
}
