//! Hierarchy reconstruction from the flat node set of one mindmap.
//!
//! The tree is rebuilt from scratch on every layout run and never cached:
//! any structural mutation may have changed it since the last call.

use std::collections::{BTreeMap, VecDeque};

use itertools::Itertools;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::error::DomainError;
use crate::domain::{MindmapId, Node, NodeId};

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Output of the tree loader: either the explicit empty marker or a rooted hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedTree {
    /// The mindmap has no nodes
    Empty,
    Rooted(MindmapTree),
}

impl LoadedTree {
    pub fn is_empty(&self) -> bool {
        matches!(self, LoadedTree::Empty)
    }

    pub fn as_rooted(&self) -> Option<&MindmapTree> {
        match self {
            LoadedTree::Empty => None,
            LoadedTree::Rooted(tree) => Some(tree),
        }
    }

    /// Number of nodes in the hierarchy.
    pub fn len(&self) -> usize {
        self.as_rooted().map_or(0, MindmapTree::len)
    }
}

/// Rooted hierarchy of a single mindmap.
#[derive(Debug, Clone, PartialEq)]
pub struct MindmapTree {
    mindmap_id: MindmapId,
    root: NodeId,
    nodes: BTreeMap<NodeId, Node>,
    /// Child ids per node, sorted by `(order_index, id)`
    children: BTreeMap<NodeId, Vec<NodeId>>,
    depth: BTreeMap<NodeId, usize>,
    /// Breadth-first visitation order starting at the root
    bfs_order: Vec<NodeId>,
}

impl MindmapTree {
    pub fn mindmap_id(&self) -> MindmapId {
        self.mindmap_id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ordered children of `id`; empty for leaves and unknown ids.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn depth_of(&self, id: NodeId) -> Option<usize> {
        self.depth.get(&id).copied()
    }

    pub fn bfs_order(&self) -> &[NodeId] {
        &self.bfs_order
    }

    /// All descendants of `id` (excluding `id`), breadth-first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut queue: VecDeque<NodeId> = self.children_of(id).iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            result.push(current);
            queue.extend(self.children_of(current).iter().copied());
        }
        result
    }

    /// Render the hierarchy for terminal display.
    pub fn to_termtree<F>(&self, label: F) -> Tree<String>
    where
        F: Fn(&Node) -> String,
    {
        fn build<F: Fn(&Node) -> String>(tree: &MindmapTree, id: NodeId, label: &F) -> Tree<String> {
            let text = tree.node(id).map(label).unwrap_or_else(|| id.to_string());
            let leaves: Vec<_> = tree
                .children_of(id)
                .iter()
                .map(|&child| build(tree, child, label))
                .collect();
            Tree::new(text).with_leaves(leaves)
        }
        build(self, self.root, &label)
    }
}

/// Build the hierarchy of `mindmap_id` from its complete node set.
///
/// Fails on any integrity violation instead of returning a partial tree:
/// - no parentless node: [`DomainError::MissingRoot`]
/// - several parentless nodes: [`DomainError::MultipleRoots`]
/// - a `parent_id` outside the set: [`DomainError::OrphanNode`]
/// - a node not reachable from the root: [`DomainError::CycleDetected`]
#[instrument(level = "debug", skip(nodes), fields(count = nodes.len()))]
pub fn build_tree(mindmap_id: MindmapId, nodes: Vec<Node>) -> TreeResult<LoadedTree> {
    if nodes.is_empty() {
        debug!("mindmap {} has no nodes", mindmap_id);
        return Ok(LoadedTree::Empty);
    }

    let nodes: BTreeMap<NodeId, Node> = nodes.into_iter().map(|n| (n.id, n)).collect();

    let roots: Vec<NodeId> = nodes.values().filter(|n| n.is_root()).map(|n| n.id).collect();
    let root = match roots.len() {
        0 => return Err(DomainError::MissingRoot { mindmap_id }),
        1 => roots[0],
        _ => return Err(DomainError::MultipleRoots { mindmap_id, roots }),
    };

    let mut children: BTreeMap<NodeId, Vec<NodeId>> =
        nodes.keys().map(|&id| (id, Vec::new())).collect();
    for node in nodes.values().sorted_by_key(|n| n.sibling_key()) {
        if let Some(parent_id) = node.parent_id {
            match children.get_mut(&parent_id) {
                Some(siblings) => siblings.push(node.id),
                None => {
                    return Err(DomainError::OrphanNode {
                        node_id: node.id,
                        parent_id,
                    })
                }
            }
        }
    }

    let mut depth = BTreeMap::from([(root, 0usize)]);
    let mut bfs_order = Vec::with_capacity(nodes.len());
    let mut queue = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        bfs_order.push(current);
        let current_depth = depth.get(&current).copied().unwrap_or(0);
        for &child in children.get(&current).map(Vec::as_slice).unwrap_or(&[]) {
            depth.insert(child, current_depth + 1);
            queue.push_back(child);
        }
    }

    // Every parent resolves, so anything left over hangs off a parent cycle.
    if let Some(unreached) = nodes.keys().find(|id| !depth.contains_key(id)) {
        return Err(DomainError::CycleDetected(*unreached));
    }

    debug!(
        "built tree for mindmap {}: {} nodes, root {}",
        mindmap_id,
        nodes.len(),
        root
    );
    Ok(LoadedTree::Rooted(MindmapTree {
        mindmap_id,
        root,
        nodes,
        children,
        depth,
        bfs_order,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::node_in;

    fn node(id: i64, parent: Option<i64>, order_index: i64) -> Node {
        node_in(MindmapId(1), id, parent, order_index)
    }

    fn rooted(nodes: Vec<Node>) -> MindmapTree {
        match build_tree(MindmapId(1), nodes).unwrap() {
            LoadedTree::Rooted(tree) => tree,
            LoadedTree::Empty => panic!("expected rooted tree"),
        }
    }

    #[test]
    fn given_no_nodes_when_building_then_returns_empty_marker() {
        assert_eq!(build_tree(MindmapId(1), vec![]).unwrap(), LoadedTree::Empty);
    }

    #[test]
    fn given_children_out_of_order_when_building_then_sorted_by_order_index_then_id() {
        let tree = rooted(vec![
            node(1, None, 0),
            node(4, Some(1), 2),
            node(3, Some(1), 0),
            node(2, Some(1), 2),
        ]);
        assert_eq!(tree.children_of(NodeId(1)), &[NodeId(3), NodeId(2), NodeId(4)]);
    }

    #[test]
    fn given_three_levels_when_building_then_depth_and_bfs_order_follow_hierarchy() {
        let tree = rooted(vec![
            node(1, None, 0),
            node(2, Some(1), 0),
            node(3, Some(1), 1),
            node(4, Some(2), 0),
        ]);
        assert_eq!(tree.root(), NodeId(1));
        assert_eq!(tree.depth_of(NodeId(1)), Some(0));
        assert_eq!(tree.depth_of(NodeId(3)), Some(1));
        assert_eq!(tree.depth_of(NodeId(4)), Some(2));
        assert_eq!(tree.bfs_order(), &[NodeId(1), NodeId(2), NodeId(3), NodeId(4)]);
        assert_eq!(tree.descendants(NodeId(1)), vec![NodeId(2), NodeId(3), NodeId(4)]);
    }

    #[test]
    fn given_no_parentless_node_when_building_then_missing_root() {
        let err = build_tree(MindmapId(1), vec![node(2, Some(1), 0)]).unwrap_err();
        assert_eq!(err, DomainError::MissingRoot { mindmap_id: MindmapId(1) });
    }

    #[test]
    fn given_two_parentless_nodes_when_building_then_multiple_roots() {
        let err = build_tree(MindmapId(1), vec![node(1, None, 0), node(2, None, 0)]).unwrap_err();
        assert_eq!(
            err,
            DomainError::MultipleRoots {
                mindmap_id: MindmapId(1),
                roots: vec![NodeId(1), NodeId(2)],
            }
        );
    }

    #[test]
    fn given_dangling_parent_when_building_then_orphan_node() {
        let err = build_tree(MindmapId(1), vec![node(1, None, 0), node(2, Some(99), 0)]).unwrap_err();
        assert_eq!(
            err,
            DomainError::OrphanNode {
                node_id: NodeId(2),
                parent_id: NodeId(99),
            }
        );
    }

    #[test]
    fn given_parent_cycle_when_building_then_cycle_detected() {
        let err = build_tree(
            MindmapId(1),
            vec![node(1, None, 0), node(2, Some(3), 0), node(3, Some(2), 0)],
        )
        .unwrap_err();
        assert_eq!(err, DomainError::CycleDetected(NodeId(2)));
    }

    #[test]
    fn given_tree_when_rendering_then_termtree_lists_children_in_order() {
        let tree = rooted(vec![node(1, None, 0), node(2, Some(1), 1), node(3, Some(1), 0)]);
        let rendered = tree.to_termtree(|n| n.title.clone()).to_string();
        let n3 = rendered.find("node 3").unwrap();
        let n2 = rendered.find("node 2").unwrap();
        assert!(rendered.starts_with("node 1"));
        assert!(n3 < n2);
    }
}
