//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, MindmapId, NodeId};
use crate::infrastructure::StoreError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("parent node {parent_id} not found in mindmap {mindmap_id}")]
    ParentNotFound {
        parent_id: NodeId,
        mindmap_id: MindmapId,
    },

    #[error("mindmap {0} already has a root node")]
    RootAlreadyExists(MindmapId),

    #[error("cannot attach node {node_id} to {parent_id}: {reason}")]
    InvalidParent {
        node_id: NodeId,
        parent_id: NodeId,
        reason: String,
    },

    #[error("title cannot be empty")]
    InvalidTitle,

    /// Generic failure of a layout run; the cause is kept for diagnostics.
    #[error("failed to update layout for mindmap {mindmap_id}")]
    LayoutFailed {
        mindmap_id: MindmapId,
        #[source]
        source: Box<ApplicationError>,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("storage operation failed: {context}")]
    Storage {
        context: String,
        #[source]
        source: StoreError,
    },
}

impl ApplicationError {
    pub fn layout_failed(mindmap_id: MindmapId, source: ApplicationError) -> Self {
        Self::LayoutFailed {
            mindmap_id,
            source: Box::new(source),
        }
    }

    /// Underlying domain error, looking through layout failures.
    pub fn domain_error(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            Self::LayoutFailed { source, .. } => source.domain_error(),
            _ => None,
        }
    }

    /// True for corrupt node sets (missing root, orphans, cycles).
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self.domain_error(),
            Some(
                DomainError::MissingRoot { .. }
                    | DomainError::MultipleRoots { .. }
                    | DomainError::OrphanNode { .. }
                    | DomainError::CycleDetected(_)
            )
        )
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
