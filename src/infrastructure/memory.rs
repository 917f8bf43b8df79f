//! In-process node store.
//!
//! A transaction works on a private snapshot and records its writes in an
//! operation log. Commit replays the log onto the shared state under the
//! store mutex; dropping the transaction discards both.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use crate::domain::{LayoutMap, MindmapId, NewNode, Node, NodeChanges, NodeId, Position};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::{NodeStore, NodeTransaction};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    nodes: BTreeMap<NodeId, Node>,
    last_id: i64,
}

impl MemoryState {
    /// `id` and its descendants; terminates on parent cycles.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = BTreeSet::from([id]);
        let mut result = vec![id];
        let mut i = 0;
        while i < result.len() {
            let current = result[i];
            for child in self.nodes.values().filter(|n| n.parent_id == Some(current)) {
                if seen.insert(child.id) {
                    result.push(child.id);
                }
            }
            i += 1;
        }
        result
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Insert(node) => {
                self.nodes.insert(node.id, node.clone());
            }
            Op::Delete(ids) => {
                for id in ids {
                    self.nodes.remove(id);
                }
            }
            Op::SetParent {
                id,
                parent_id,
                order_index,
            } => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.parent_id = Some(*parent_id);
                    node.order_index = *order_index;
                }
            }
            Op::Update { id, changes } => {
                if let Some(node) = self.nodes.get_mut(id) {
                    if let Some(title) = &changes.title {
                        node.title = title.clone();
                    }
                    if let Some(content) = &changes.content {
                        node.content = Some(content.clone());
                    }
                    if let Some(order_index) = changes.order_index {
                        node.order_index = order_index;
                    }
                }
            }
            Op::Positions(positions) => {
                for (id, position) in positions {
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.x_position = position.x;
                        node.y_position = position.y;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Insert(Node),
    Delete(Vec<NodeId>),
    SetParent {
        id: NodeId,
        parent_id: NodeId,
        order_index: i64,
    },
    Update {
        id: NodeId,
        changes: NodeChanges,
    },
    Positions(Vec<(NodeId, Position)>),
}

/// Node store kept in memory, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    shared: Arc<Mutex<MemoryState>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `nodes` as given, without any validation.
    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut state = MemoryState::default();
        for node in nodes {
            state.last_id = state.last_id.max(node.id.0);
            state.nodes.insert(node.id, node);
        }
        Self {
            shared: Arc::new(Mutex::new(state)),
        }
    }

    /// Committed nodes of a mindmap, ordered by id.
    pub fn snapshot(&self, mindmap_id: MindmapId) -> StoreResult<Vec<Node>> {
        Ok(lock(&self.shared)?
            .nodes
            .values()
            .filter(|n| n.mindmap_id == mindmap_id)
            .cloned()
            .collect())
    }
}

fn lock(shared: &Mutex<MemoryState>) -> StoreResult<MutexGuard<'_, MemoryState>> {
    shared.lock().map_err(|_| StoreError::Poisoned)
}

impl NodeStore for MemoryNodeStore {
    fn begin(&self) -> StoreResult<Box<dyn NodeTransaction>> {
        let working = lock(&self.shared)?.clone();
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            working,
            ops: Vec::new(),
        }))
    }
}

struct MemoryTransaction {
    shared: Arc<Mutex<MemoryState>>,
    working: MemoryState,
    ops: Vec<Op>,
}

impl MemoryTransaction {
    fn record(&mut self, op: Op) {
        self.working.apply(&op);
        self.ops.push(op);
    }
}

impl NodeTransaction for MemoryTransaction {
    fn fetch_nodes(&mut self, mindmap_id: MindmapId) -> StoreResult<Vec<Node>> {
        Ok(self
            .working
            .nodes
            .values()
            .filter(|n| n.mindmap_id == mindmap_id)
            .cloned()
            .collect())
    }

    fn find_node(&mut self, id: NodeId) -> StoreResult<Option<Node>> {
        Ok(self.working.nodes.get(&id).cloned())
    }

    fn max_order_index(
        &mut self,
        mindmap_id: MindmapId,
        parent_id: Option<NodeId>,
    ) -> StoreResult<Option<i64>> {
        Ok(self
            .working
            .nodes
            .values()
            .filter(|n| n.mindmap_id == mindmap_id && n.parent_id == parent_id)
            .map(|n| n.order_index)
            .max())
    }

    fn insert_node(&mut self, node: NewNode) -> StoreResult<Node> {
        // Ids come from the shared counter so concurrent transactions never collide.
        let id = {
            let mut shared = lock(&self.shared)?;
            shared.last_id += 1;
            NodeId(shared.last_id)
        };
        let node = Node {
            id,
            mindmap_id: node.mindmap_id,
            parent_id: node.parent_id,
            title: node.title,
            content: node.content,
            order_index: node.order_index,
            x_position: 0.0,
            y_position: 0.0,
            created_at: Utc::now(),
        };
        self.record(Op::Insert(node.clone()));
        Ok(node)
    }

    fn delete_subtree(&mut self, id: NodeId) -> StoreResult<usize> {
        if !self.working.nodes.contains_key(&id) {
            return Err(StoreError::NodeNotFound(id));
        }
        let ids = self.working.subtree(id);
        let removed = ids.len();
        self.record(Op::Delete(ids));
        Ok(removed)
    }

    fn set_parent(&mut self, id: NodeId, parent_id: NodeId, order_index: i64) -> StoreResult<()> {
        if !self.working.nodes.contains_key(&id) {
            return Err(StoreError::NodeNotFound(id));
        }
        self.record(Op::SetParent {
            id,
            parent_id,
            order_index,
        });
        Ok(())
    }

    fn update_node(&mut self, id: NodeId, changes: &NodeChanges) -> StoreResult<()> {
        if !self.working.nodes.contains_key(&id) {
            return Err(StoreError::NodeNotFound(id));
        }
        self.record(Op::Update {
            id,
            changes: changes.clone(),
        });
        Ok(())
    }

    fn batch_update_positions(&mut self, positions: &LayoutMap) -> StoreResult<usize> {
        let batch: Vec<(NodeId, Position)> = positions
            .iter()
            .filter(|(id, _)| self.working.nodes.contains_key(*id))
            .map(|(&id, &p)| (id, p))
            .collect();
        let updated = batch.len();
        self.record(Op::Positions(batch));
        Ok(updated)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut shared = lock(&self.shared)?;
        for op in &self.ops {
            shared.apply(op);
        }
        debug!("memory store: committed {} operations", self.ops.len());
        Ok(())
    }
}
