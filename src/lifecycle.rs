//! Scoped lifecycle for provisioned backing-service resources.
//!
//! A [`ManagedTable`] guarantees the table it guards is deleted exactly once
//! after the test, independent of test outcome. Release is idempotent and
//! treats "already deleted" as success; any other cleanup failure is handled
//! according to the configured [`CleanupPolicy`] so it never masks the
//! primary test failure.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::storage::{StorageError, TableManager};

/// What to do when releasing a resource fails for a reason other than the
/// resource already being gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Log at debug and report success (the legacy behavior).
    Swallow,
    /// Log at warn and report success.
    #[default]
    Warn,
    /// Surface a `Cleanup` error to the caller.
    Fail,
}

/// Guard over one provisioned table.
pub struct ManagedTable {
    manager: Arc<dyn TableManager>,
    table_id: String,
    policy: CleanupPolicy,
    released: bool,
}

impl std::fmt::Debug for ManagedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedTable")
            .field("table_id", &self.table_id)
            .field("policy", &self.policy)
            .field("released", &self.released)
            .finish()
    }
}

impl ManagedTable {
    /// Creates the table and returns its guard. Creation failures (including
    /// an id collision) propagate untouched.
    pub async fn acquire(
        manager: Arc<dyn TableManager>,
        table_id: &str,
        families: &[&str],
        policy: CleanupPolicy,
    ) -> Result<Self, StorageError> {
        manager.create_table(table_id, families).await?;
        log::info!("provisioned table '{table_id}'");
        Ok(Self {
            manager,
            table_id: table_id.to_string(),
            policy,
            released: false,
        })
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Deletes the guarded table. Safe to call any number of times; a table
    /// that is already gone counts as released.
    pub async fn release(&mut self) -> Result<(), HarnessError> {
        if self.released {
            return Ok(());
        }

        match self.manager.delete_table(&self.table_id).await {
            Ok(()) => {
                log::info!("released table '{}'", self.table_id);
                self.released = true;
                Ok(())
            }
            Err(StorageError::TableNotFound(_)) => {
                log::debug!("table '{}' already deleted", self.table_id);
                self.released = true;
                Ok(())
            }
            Err(e) => match self.policy {
                CleanupPolicy::Swallow => {
                    log::debug!("ignoring cleanup failure for table '{}': {e}", self.table_id);
                    self.released = true;
                    Ok(())
                }
                CleanupPolicy::Warn => {
                    log::warn!("cleanup failure for table '{}': {e}", self.table_id);
                    self.released = true;
                    Ok(())
                }
                CleanupPolicy::Fail => Err(HarnessError::Cleanup {
                    resource: format!("table '{}'", self.table_id),
                    message: e.to_string(),
                }),
            },
        }
    }
}

impl Drop for ManagedTable {
    fn drop(&mut self) {
        // Release is async and cannot run here; teardown paths are expected
        // to have called it already.
        if !self.released {
            log::warn!(
                "table '{}' dropped without release; the backing resource leaks",
                self.table_id
            );
        }
    }
}
