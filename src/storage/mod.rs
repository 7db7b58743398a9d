//! Table storage boundary.
//!
//! The harness provisions and reads back tables only through the
//! [`TableManager`] trait, so a test run can target the in-memory emulator
//! shipped here or any external store an integration suite wires in.

pub mod memory;
pub mod row;

pub use memory::InMemoryTableManager;
pub use row::{RowCell, RowRecord};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("table '{table}' has no column family '{family}'")]
    UnknownFamily { table: String, family: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Provisions, mutates, and reads back tables scoped to one test run.
#[async_trait]
pub trait TableManager: Send + Sync {
    /// Creates a table with the given column families.
    ///
    /// Fails with [`StorageError::TableAlreadyExists`] when the id collides
    /// with an existing table; it never silently overwrites.
    async fn create_table(&self, table_id: &str, families: &[&str]) -> Result<(), StorageError>;

    /// Writes one row, merging cells into any existing row with the same key.
    /// Every cell's family must have been declared at table creation.
    async fn write_row(&self, table_id: &str, row: RowRecord) -> Result<(), StorageError>;

    /// Reads all rows in key order.
    async fn read_table(&self, table_id: &str) -> Result<Vec<RowRecord>, StorageError>;

    /// Deletes a table. Deleting an absent table fails with
    /// [`StorageError::TableNotFound`]; idempotent release semantics live in
    /// the lifecycle layer, not here.
    async fn delete_table(&self, table_id: &str) -> Result<(), StorageError>;

    /// Drops every table owned by this manager.
    async fn delete_all(&self) -> Result<(), StorageError>;

    async fn table_exists(&self, table_id: &str) -> bool;
}
