//! Canned templates and payloads for exercising the harness end-to-end.
//!
//! The import template here is the in-process stand-in for an external
//! managed import pipeline: it reads a staged Avro artifact and writes its
//! rows into a provisioned table, which is exactly the surface the harness
//! needs to drive a full stage → launch → poll → assert → teardown cycle.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::avro::RowCodec;
use crate::launcher::{Template, TemplateParams};
use crate::staging::StagingArea;
use crate::storage::{RowCell, RowRecord, TableManager};

pub const TEMPLATE_AVRO_TO_TABLE: &str = "avro-to-table";

pub const PARAM_PROJECT_ID: &str = "projectId";
pub const PARAM_INSTANCE_ID: &str = "instanceId";
pub const PARAM_TABLE_ID: &str = "tableId";
pub const PARAM_INPUT_FILE_PATTERN: &str = "inputFilePattern";

/// Imports a staged Avro fixture file into a table.
pub struct AvroImportTemplate {
    staging: Arc<dyn StagingArea>,
    tables: Arc<dyn TableManager>,
}

impl AvroImportTemplate {
    pub fn new(staging: Arc<dyn StagingArea>, tables: Arc<dyn TableManager>) -> Self {
        Self { staging, tables }
    }
}

#[async_trait]
impl Template for AvroImportTemplate {
    fn required_parameters(&self) -> &[&str] {
        &[PARAM_TABLE_ID, PARAM_INPUT_FILE_PATTERN]
    }

    async fn run(&self, params: &TemplateParams) -> anyhow::Result<()> {
        let table_id = params.require(PARAM_TABLE_ID)?;
        let input = params.require(PARAM_INPUT_FILE_PATTERN)?;

        let bytes = self
            .staging
            .read(input)
            .await
            .with_context(|| format!("reading staged input '{input}'"))?;

        let codec = RowCodec::new().context("building row codec")?;
        let rows = codec
            .decode_rows(&bytes)
            .with_context(|| format!("decoding staged input '{input}'"))?;

        log::info!("importing {} row(s) into table '{table_id}'", rows.len());
        for row in rows {
            self.tables
                .write_row(table_id, row)
                .await
                .with_context(|| format!("writing row to table '{table_id}'"))?;
        }
        Ok(())
    }
}

/// The canonical import fixture: one key carrying a single "family1" cell
/// and two "family2" cells under the same qualifier.
pub fn sample_import_rows() -> Vec<RowRecord> {
    vec![RowRecord::new("key1")
        .with_cell("family1", RowCell::new("column1", "value1").with_timestamp(1_000))
        .with_cell("family2", RowCell::new("column2", "value2").with_timestamp(2_000))
        .with_cell("family2", RowCell::new("column2", "value3").with_timestamp(3_000))]
}

/// Column families the sample fixture expects the target table to declare.
pub fn sample_import_families() -> Vec<&'static str> {
    vec!["family1", "family2"]
}
