//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::{MindmapId, NodeId};

/// Domain errors represent structural integrity violations of a mindmap.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("no root node found for mindmap {mindmap_id}")]
    MissingRoot { mindmap_id: MindmapId },

    #[error("mindmap {mindmap_id} has {} root nodes: {roots:?}", roots.len())]
    MultipleRoots {
        mindmap_id: MindmapId,
        roots: Vec<NodeId>,
    },

    #[error("node {node_id} references missing parent {parent_id}")]
    OrphanNode { node_id: NodeId, parent_id: NodeId },

    #[error("node {0} is not reachable from the root (parent cycle)")]
    CycleDetected(NodeId),

    #[error("invalid layout config: {0}")]
    InvalidLayoutConfig(String),
}
