//! Assertion layer for read-back table contents.
//!
//! Compares unordered collections of produced records per column family
//! against expected ones, independent of physical storage ordering, and
//! fails with a mismatch that names what is missing, extra, or altered
//! instead of a generic equality failure.

use std::collections::BTreeMap;
use std::fmt;

use crate::storage::RowRecord;

/// One produced or expected record: a (column → value) projection of a cell.
pub type Record = BTreeMap<String, String>;

/// Convenience constructor for expected records.
pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Projects every cell of the named family across all rows into single-entry
/// records, the shape the original assertion helpers compare against.
pub fn family_records(rows: &[RowRecord], family: &str) -> FamilyRecords {
    let records = rows
        .iter()
        .flat_map(|row| row.cells(family))
        .map(|cell| {
            let mut rec = Record::new();
            rec.insert(cell.qualifier_lossy(), cell.value_lossy());
            rec
        })
        .collect();
    FamilyRecords {
        family: family.to_string(),
        records,
    }
}

#[derive(Debug, Clone)]
pub struct FamilyRecords {
    family: String,
    records: Vec<Record>,
}

impl FamilyRecords {
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Asserts the produced records equal `expected` as unordered multisets.
    pub fn assert_exactly(&self, expected: &[Record]) -> Result<(), RecordMismatch> {
        let (missing, extra) = diff_multisets(expected, &self.records);
        self.verdict(missing, extra)
    }

    /// Asserts every expected record matches at least one distinct produced
    /// record; extra produced records are allowed.
    pub fn assert_contains(&self, expected: &[Record]) -> Result<(), RecordMismatch> {
        let (missing, _extra) = diff_multisets(expected, &self.records);
        self.verdict(missing, Vec::new())
    }

    fn verdict(&self, missing: Vec<Record>, extra: Vec<Record>) -> Result<(), RecordMismatch> {
        if missing.is_empty() && extra.is_empty() {
            return Ok(());
        }
        Err(RecordMismatch::new(&self.family, missing, extra))
    }
}

/// Multiset difference in both directions: (expected - actual, actual - expected).
fn diff_multisets(expected: &[Record], actual: &[Record]) -> (Vec<Record>, Vec<Record>) {
    let mut remaining: Vec<Option<&Record>> = actual.iter().map(Some).collect();
    let mut missing = Vec::new();

    for exp in expected {
        match remaining.iter_mut().find(|slot| slot.as_ref() == Some(&exp)) {
            Some(slot) => *slot = None,
            None => missing.push(exp.clone()),
        }
    }

    let extra = remaining.into_iter().flatten().cloned().collect();
    (missing, extra)
}

/// Descriptive failure produced by the assertion layer.
///
/// A missing record and an extra record over the same column set are paired
/// up and reported as a single altered record.
#[derive(Debug, Clone)]
pub struct RecordMismatch {
    pub family: String,
    pub missing: Vec<Record>,
    pub extra: Vec<Record>,
    pub altered: Vec<(Record, Record)>,
}

impl RecordMismatch {
    fn new(family: &str, mut missing: Vec<Record>, mut extra: Vec<Record>) -> Self {
        let mut altered = Vec::new();

        let mut i = 0;
        while i < missing.len() {
            let columns: Vec<&String> = missing[i].keys().collect();
            match extra
                .iter()
                .position(|e| e.keys().collect::<Vec<_>>() == columns)
            {
                Some(j) => {
                    let exp = missing.remove(i);
                    let act = extra.remove(j);
                    altered.push((exp, act));
                }
                None => i += 1,
            }
        }

        Self {
            family: family.to_string(),
            missing,
            extra,
            altered,
        }
    }
}

fn fmt_record(record: &Record) -> String {
    let inner: Vec<String> = record.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", inner.join(", "))
}

impl fmt::Display for RecordMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "family '{}': {} missing, {} extra, {} altered",
            self.family,
            self.missing.len(),
            self.extra.len(),
            self.altered.len()
        )?;
        for rec in &self.missing {
            write!(f, "\n  missing: {}", fmt_record(rec))?;
        }
        for rec in &self.extra {
            write!(f, "\n  extra:   {}", fmt_record(rec))?;
        }
        for (exp, act) in &self.altered {
            write!(
                f,
                "\n  altered: expected {} but found {}",
                fmt_record(exp),
                fmt_record(act)
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for RecordMismatch {}
