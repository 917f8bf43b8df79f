//! Infrastructure layer: store implementations and DI container
//!
//! This layer implements the node store boundary traits and wires up services.

pub mod di;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use di::ServiceContainer;
pub use error::{InfraError, InfraResult, StoreError, StoreResult};
pub use memory::MemoryNodeStore;
pub use sqlite::SqliteNodeStore;
