//! Node mutation service
//!
//! Every change (create, delete, move, update) is followed by a full
//! re-layout of the mindmap in the same transaction, under the mindmap lock.
//! Readers therefore never see a new node at its default position or a
//! partially laid-out tree.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::LayoutService;
use crate::application::{ApplicationError, ApplicationResult, MindmapLocks, StoreResultExt};
use crate::domain::{LoadedTree, MindmapId, NewNode, Node, NodeChanges, NodeId};
use crate::infrastructure::traits::{NodeStore, NodeTransaction};

/// Request to add a node to a mindmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNode {
    pub mindmap_id: MindmapId,
    /// `None` creates the root of an empty mindmap
    pub parent_id: Option<NodeId>,
    pub title: String,
    pub content: Option<String>,
}

/// Outcome of a subtree deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSummary {
    pub mindmap_id: MindmapId,
    pub removed: usize,
}

/// Service for structural node mutations.
pub struct NodeService {
    store: Arc<dyn NodeStore>,
    layout: Arc<LayoutService>,
    locks: Arc<MindmapLocks>,
}

impl NodeService {
    /// Create a new node service.
    pub fn new(
        store: Arc<dyn NodeStore>,
        layout: Arc<LayoutService>,
        locks: Arc<MindmapLocks>,
    ) -> Self {
        Self {
            store,
            layout,
            locks,
        }
    }

    fn begin(&self) -> ApplicationResult<Box<dyn NodeTransaction>> {
        self.store.begin().with_store_context("begin transaction")
    }

    fn begin_read(&self) -> ApplicationResult<Box<dyn NodeTransaction>> {
        self.store
            .begin_read()
            .with_store_context("begin read transaction")
    }

    /// Mindmap owning `node_id`; a node never changes mindmap.
    fn mindmap_of(&self, node_id: NodeId) -> ApplicationResult<MindmapId> {
        let mut tx = self.begin_read()?;
        tx.find_node(node_id)
            .with_store_context("find node")?
            .map(|n| n.mindmap_id)
            .ok_or(ApplicationError::NodeNotFound(node_id))
    }

    /// Re-layout, read back `node_id` with its final position, commit.
    fn finish(
        &self,
        mut tx: Box<dyn NodeTransaction>,
        mindmap_id: MindmapId,
        node_id: NodeId,
    ) -> ApplicationResult<Node> {
        self.layout.relayout_in(tx.as_mut(), mindmap_id)?;
        let node = tx
            .find_node(node_id)
            .with_store_context("read back node")?
            .ok_or(ApplicationError::NodeNotFound(node_id))?;
        tx.commit().with_store_context("commit")?;
        Ok(node)
    }

    /// Add a node as the last child of its parent and re-layout the mindmap.
    #[instrument(skip(self), fields(mindmap = %request.mindmap_id))]
    pub fn create_node(&self, request: CreateNode) -> ApplicationResult<Node> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ApplicationError::InvalidTitle);
        }
        let mindmap_id = request.mindmap_id;

        self.locks.with_lock(mindmap_id, || {
            let mut tx = self.begin()?;

            match request.parent_id {
                Some(parent_id) => {
                    let parent = tx.find_node(parent_id).with_store_context("find parent")?;
                    if !parent.is_some_and(|p| p.mindmap_id == mindmap_id) {
                        return Err(ApplicationError::ParentNotFound {
                            parent_id,
                            mindmap_id,
                        });
                    }
                }
                None => {
                    let existing = tx
                        .fetch_nodes(mindmap_id)
                        .with_store_context("fetch nodes")?;
                    if !existing.is_empty() {
                        return Err(ApplicationError::RootAlreadyExists(mindmap_id));
                    }
                }
            }

            let order_index = tx
                .max_order_index(mindmap_id, request.parent_id)
                .with_store_context("read sibling order")?
                .map_or(0, |max| max + 1);
            let node = tx
                .insert_node(NewNode {
                    mindmap_id,
                    parent_id: request.parent_id,
                    title: title.to_string(),
                    content: request.content.clone(),
                    order_index,
                })
                .with_store_context("insert node")?;
            debug!("inserted node {} at order {}", node.id, order_index);

            let node = self.finish(tx, mindmap_id, node.id)?;
            info!("created node {} at {}", node.id, node.position());
            Ok(node)
        })
    }

    /// Delete a node with all its descendants and re-layout the remainder.
    #[instrument(skip(self))]
    pub fn delete_node(&self, node_id: NodeId) -> ApplicationResult<DeleteSummary> {
        let mindmap_id = self.mindmap_of(node_id)?;

        self.locks.with_lock(mindmap_id, || {
            let mut tx = self.begin()?;
            let removed = tx
                .delete_subtree(node_id)
                .with_store_context("delete subtree")?;
            self.layout.relayout_in(tx.as_mut(), mindmap_id)?;
            tx.commit().with_store_context("commit")?;
            info!("deleted {} nodes from mindmap {}", removed, mindmap_id);
            Ok(DeleteSummary {
                mindmap_id,
                removed,
            })
        })
    }

    /// Re-parent a node (with its subtree) as the last child of `new_parent_id`.
    #[instrument(skip(self))]
    pub fn move_node(&self, node_id: NodeId, new_parent_id: NodeId) -> ApplicationResult<Node> {
        let invalid = |reason: &str| ApplicationError::InvalidParent {
            node_id,
            parent_id: new_parent_id,
            reason: reason.to_string(),
        };
        if node_id == new_parent_id {
            return Err(invalid("node cannot be its own parent"));
        }
        let mindmap_id = self.mindmap_of(node_id)?;

        self.locks.with_lock(mindmap_id, || {
            let mut tx = self.begin()?;
            let loaded = self.layout.load_tree(tx.as_mut(), mindmap_id)?;
            let tree = loaded
                .as_rooted()
                .ok_or(ApplicationError::NodeNotFound(node_id))?;

            if !tree.contains(node_id) {
                return Err(ApplicationError::NodeNotFound(node_id));
            }
            if !tree.contains(new_parent_id) {
                return Err(ApplicationError::ParentNotFound {
                    parent_id: new_parent_id,
                    mindmap_id,
                });
            }
            if tree.root() == node_id {
                return Err(invalid("the root cannot be moved"));
            }
            if tree.descendants(node_id).contains(&new_parent_id) {
                return Err(invalid("cannot move a node under its own descendant"));
            }

            let order_index = tx
                .max_order_index(mindmap_id, Some(new_parent_id))
                .with_store_context("read sibling order")?
                .map_or(0, |max| max + 1);
            tx.set_parent(node_id, new_parent_id, order_index)
                .with_store_context("update parent")?;

            let node = self.finish(tx, mindmap_id, node_id)?;
            info!("moved node {} under {}", node_id, new_parent_id);
            Ok(node)
        })
    }

    /// Edit title, content or sibling order of a node and re-layout the mindmap.
    ///
    /// A changed `order_index` moves the node among its siblings, which moves
    /// it around its parent.
    #[instrument(skip(self))]
    pub fn update_node(&self, node_id: NodeId, changes: NodeChanges) -> ApplicationResult<Node> {
        let title = match changes.title.as_deref().map(str::trim) {
            Some("") => return Err(ApplicationError::InvalidTitle),
            other => other.map(str::to_string),
        };
        let changes = NodeChanges { title, ..changes };
        let mindmap_id = self.mindmap_of(node_id)?;

        self.locks.with_lock(mindmap_id, || {
            let mut tx = self.begin()?;
            if changes.is_empty() {
                debug!("no changes for node {}", node_id);
            } else {
                tx.update_node(node_id, &changes)
                    .with_store_context("update node")?;
            }
            let node = self.finish(tx, mindmap_id, node_id)?;
            info!("updated node {}", node);
            Ok(node)
        })
    }

    /// All nodes of a mindmap, ordered by id.
    pub fn list_nodes(&self, mindmap_id: MindmapId) -> ApplicationResult<Vec<Node>> {
        let mut tx = self.begin_read()?;
        tx.fetch_nodes(mindmap_id).with_store_context("fetch nodes")
    }

    /// Current hierarchy of a mindmap.
    pub fn tree(&self, mindmap_id: MindmapId) -> ApplicationResult<LoadedTree> {
        let mut tx = self.begin_read()?;
        self.layout.load_tree(tx.as_mut(), mindmap_id)
    }
}
