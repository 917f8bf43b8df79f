//! Error conversion helpers for store operations
//!
//! Provides an extension trait for cleaner error handling with context.

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::{StoreError, StoreResult};

/// Extension trait for converting `StoreResult` to `ApplicationResult` with context.
pub trait StoreResultExt<T> {
    /// Add context to a store error.
    ///
    /// A missing node keeps its own variant so callers can report it directly.
    ///
    /// # Example
    /// ```ignore
    /// tx.fetch_nodes(mindmap_id)
    ///     .with_store_context("fetch nodes")?;
    /// ```
    fn with_store_context(self, action: &str) -> ApplicationResult<T>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn with_store_context(self, action: &str) -> ApplicationResult<T> {
        self.map_err(|e| match e {
            StoreError::NodeNotFound(id) => ApplicationError::NodeNotFound(id),
            other => ApplicationError::Storage {
                context: action.to_string(),
                source: other,
            },
        })
    }
}
