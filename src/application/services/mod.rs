//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the store boundary traits (NodeStore, NodeTransaction)
//! but are themselves concrete structs, not traits.

mod layout;
mod nodes;

pub use layout::{LayoutService, LayoutSummary};
pub use nodes::{CreateNode, DeleteSummary, NodeService};
