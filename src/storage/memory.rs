use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use dashmap::DashMap;

use super::row::RowRecord;
use super::{StorageError, TableManager};

#[derive(Debug, Default)]
struct TableData {
    families: BTreeSet<String>,
    rows: BTreeMap<Vec<u8>, RowRecord>,
}

/// In-process table store used as the local stand-in for an external
/// table service. Tables are held in a concurrent map so parallel test runs
/// sharing one manager stay isolated through their unique table ids.
#[derive(Debug, Default)]
pub struct InMemoryTableManager {
    tables: DashMap<String, TableData>,
}

impl InMemoryTableManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[async_trait]
impl TableManager for InMemoryTableManager {
    async fn create_table(&self, table_id: &str, families: &[&str]) -> Result<(), StorageError> {
        // Entry-based insert keeps the existence check and the insert atomic.
        match self.tables.entry(table_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StorageError::TableAlreadyExists(table_id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(TableData {
                    families: families.iter().map(|f| f.to_string()).collect(),
                    rows: BTreeMap::new(),
                });
                log::debug!("created table '{table_id}' with {} families", families.len());
                Ok(())
            }
        }
    }

    async fn write_row(&self, table_id: &str, row: RowRecord) -> Result<(), StorageError> {
        let mut table = self
            .tables
            .get_mut(table_id)
            .ok_or_else(|| StorageError::TableNotFound(table_id.to_string()))?;

        for family in row.families() {
            if !table.families.contains(family) {
                return Err(StorageError::UnknownFamily {
                    table: table_id.to_string(),
                    family: family.to_string(),
                });
            }
        }

        match table.rows.get_mut(row.key()) {
            Some(existing) => existing.merge(row),
            None => {
                table.rows.insert(row.key().to_vec(), row);
            }
        }
        Ok(())
    }

    async fn read_table(&self, table_id: &str) -> Result<Vec<RowRecord>, StorageError> {
        let table = self
            .tables
            .get(table_id)
            .ok_or_else(|| StorageError::TableNotFound(table_id.to_string()))?;
        Ok(table.rows.values().cloned().collect())
    }

    async fn delete_table(&self, table_id: &str) -> Result<(), StorageError> {
        match self.tables.remove(table_id) {
            Some(_) => {
                log::debug!("deleted table '{table_id}'");
                Ok(())
            }
            None => Err(StorageError::TableNotFound(table_id.to_string())),
        }
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        let count = self.tables.len();
        self.tables.clear();
        log::debug!("deleted all tables ({count})");
        Ok(())
    }

    async fn table_exists(&self, table_id: &str) -> bool {
        self.tables.contains_key(table_id)
    }
}
