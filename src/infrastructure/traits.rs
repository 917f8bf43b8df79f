//! I/O boundary traits for testability
//!
//! The layout services only talk to storage through these traits, so they
//! can run against SQLite in production and an in-process store in tests.

use crate::domain::{LayoutMap, MindmapId, NewNode, Node, NodeChanges, NodeId};
use crate::infrastructure::error::StoreResult;

/// Source of transactions over the persisted node set.
pub trait NodeStore: Send + Sync {
    /// Start a transaction.
    ///
    /// Dropping the returned transaction without calling
    /// [`NodeTransaction::commit`] rolls back every change made through it.
    fn begin(&self) -> StoreResult<Box<dyn NodeTransaction>>;

    /// Start a transaction that only reads.
    ///
    /// Stores that lock for writing up front override this so readers do not
    /// block writers.
    fn begin_read(&self) -> StoreResult<Box<dyn NodeTransaction>> {
        self.begin()
    }
}

/// Reads and writes inside one store transaction.
///
/// Reads observe the transaction's own earlier writes.
pub trait NodeTransaction: Send {
    /// All nodes of a mindmap, ordered by id.
    fn fetch_nodes(&mut self, mindmap_id: MindmapId) -> StoreResult<Vec<Node>>;

    fn find_node(&mut self, id: NodeId) -> StoreResult<Option<Node>>;

    /// Highest `order_index` among the children of `parent_id` (`None`: roots).
    fn max_order_index(
        &mut self,
        mindmap_id: MindmapId,
        parent_id: Option<NodeId>,
    ) -> StoreResult<Option<i64>>;

    /// Insert a node at the origin and return it with its assigned id.
    fn insert_node(&mut self, node: NewNode) -> StoreResult<Node>;

    /// Delete a node and all its descendants. Returns the number of removed nodes.
    fn delete_subtree(&mut self, id: NodeId) -> StoreResult<usize>;

    /// Attach `id` under `parent_id` with the given sibling order.
    fn set_parent(&mut self, id: NodeId, parent_id: NodeId, order_index: i64) -> StoreResult<()>;

    /// Apply the set fields of `changes` to `id`.
    fn update_node(&mut self, id: NodeId, changes: &NodeChanges) -> StoreResult<()>;

    /// Write all positions of `positions` in one batch. Returns the number of updated nodes.
    fn batch_update_positions(&mut self, positions: &LayoutMap) -> StoreResult<usize>;

    fn commit(self: Box<Self>) -> StoreResult<()>;
}
