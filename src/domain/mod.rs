//! Domain layer: entities and layout logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod layout;
pub mod tree;

pub use entities::*;
pub use error::DomainError;
pub use layout::{compute_layout, subtree_sizes, LayoutConfig, Wedge};
pub use tree::{build_tree, LoadedTree, MindmapTree, TreeResult};
