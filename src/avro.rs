//! Avro interchange codec for fixture row files.
//!
//! Pipeline input fixtures are Avro container files of `PipelineRow` records:
//! a row key plus an array of (family, qualifier, timestamp, value) cells.
//! The codec exists so fixtures can be generated programmatically and
//! verified byte-for-byte after a run.

use apache_avro::types::Value as AvroValue;
use apache_avro::{Reader, Schema, Writer};
use thiserror::Error;

use crate::storage::{RowCell, RowRecord};

pub const ROW_SCHEMA_JSON: &str = r#"
{
    "type": "record",
    "name": "PipelineRow",
    "fields": [
        {"name": "key", "type": "bytes"},
        {
            "name": "cells",
            "type": {
                "type": "array",
                "items": {
                    "type": "record",
                    "name": "PipelineCell",
                    "fields": [
                        {"name": "family", "type": "string"},
                        {"name": "qualifier", "type": "bytes"},
                        {"name": "timestamp", "type": "long"},
                        {"name": "value", "type": "bytes"}
                    ]
                }
            }
        }
    ]
}
"#;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid row schema: {0}")]
    Schema(String),

    #[error("failed to encode rows: {0}")]
    Encode(String),

    #[error("failed to decode rows: {0}")]
    Decode(String),
}

/// Encodes and decodes [`RowRecord`]s as Avro container files.
pub struct RowCodec {
    schema: Schema,
}

impl RowCodec {
    pub fn new() -> Result<Self, CodecError> {
        let schema =
            Schema::parse_str(ROW_SCHEMA_JSON).map_err(|e| CodecError::Schema(e.to_string()))?;
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn encode_rows(&self, rows: &[RowRecord]) -> Result<Vec<u8>, CodecError> {
        let mut writer = Writer::new(&self.schema, Vec::new());
        for row in rows {
            writer
                .append(row_to_avro(row))
                .map_err(|e| CodecError::Encode(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn decode_rows(&self, bytes: &[u8]) -> Result<Vec<RowRecord>, CodecError> {
        let reader = Reader::with_schema(&self.schema, bytes)
            .map_err(|e| CodecError::Decode(e.to_string()))?;

        let mut rows = Vec::new();
        for record in reader {
            let value = record.map_err(|e| CodecError::Decode(e.to_string()))?;
            rows.push(avro_to_row(&value)?);
        }
        Ok(rows)
    }
}

fn row_to_avro(row: &RowRecord) -> AvroValue {
    let cells: Vec<AvroValue> = row
        .iter_cells()
        .map(|(family, cell)| {
            AvroValue::Record(vec![
                ("family".to_string(), AvroValue::String(family.to_string())),
                ("qualifier".to_string(), AvroValue::Bytes(cell.qualifier.clone())),
                ("timestamp".to_string(), AvroValue::Long(cell.timestamp_micros)),
                ("value".to_string(), AvroValue::Bytes(cell.value.clone())),
            ])
        })
        .collect();

    AvroValue::Record(vec![
        ("key".to_string(), AvroValue::Bytes(row.key().to_vec())),
        ("cells".to_string(), AvroValue::Array(cells)),
    ])
}

fn avro_to_row(value: &AvroValue) -> Result<RowRecord, CodecError> {
    let fields = match value {
        AvroValue::Record(fields) => fields,
        other => {
            return Err(CodecError::Decode(format!(
                "expected row record, found {other:?}"
            )))
        }
    };

    let mut row = None;
    let mut cells: &[AvroValue] = &[];
    for (name, field) in fields {
        match (name.as_str(), field) {
            ("key", AvroValue::Bytes(key)) => row = Some(RowRecord::new(key.clone())),
            ("cells", AvroValue::Array(items)) => cells = items.as_slice(),
            _ => {
                return Err(CodecError::Decode(format!(
                    "unexpected row field '{name}': {field:?}"
                )))
            }
        }
    }

    let mut row = row.ok_or_else(|| CodecError::Decode("row record has no key".to_string()))?;
    for item in cells {
        let (family, cell) = avro_to_cell(item)?;
        row.push_cell(&family, cell);
    }
    Ok(row)
}

fn avro_to_cell(value: &AvroValue) -> Result<(String, RowCell), CodecError> {
    let fields = match value {
        AvroValue::Record(fields) => fields,
        other => {
            return Err(CodecError::Decode(format!(
                "expected cell record, found {other:?}"
            )))
        }
    };

    let mut family = None;
    let mut qualifier = None;
    let mut timestamp = 0i64;
    let mut cell_value = None;
    for (name, field) in fields {
        match (name.as_str(), field) {
            ("family", AvroValue::String(s)) => family = Some(s.clone()),
            ("qualifier", AvroValue::Bytes(b)) => qualifier = Some(b.clone()),
            ("timestamp", AvroValue::Long(ts)) => timestamp = *ts,
            ("value", AvroValue::Bytes(b)) => cell_value = Some(b.clone()),
            _ => {
                return Err(CodecError::Decode(format!(
                    "unexpected cell field '{name}': {field:?}"
                )))
            }
        }
    }

    let family = family.ok_or_else(|| CodecError::Decode("cell has no family".to_string()))?;
    let qualifier =
        qualifier.ok_or_else(|| CodecError::Decode("cell has no qualifier".to_string()))?;
    let cell_value = cell_value.ok_or_else(|| CodecError::Decode("cell has no value".to_string()))?;

    Ok((
        family,
        RowCell::new(qualifier, cell_value).with_timestamp(timestamp),
    ))
}
