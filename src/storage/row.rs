use std::collections::BTreeMap;

/// A single cell within a column family.
///
/// A family may hold several cells under the same qualifier (distinct values
/// written at distinct timestamps), so cells are kept as a list rather than a
/// qualifier-keyed map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCell {
    pub qualifier: Vec<u8>,
    pub value: Vec<u8>,
    pub timestamp_micros: i64,
}

impl RowCell {
    pub fn new(qualifier: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            qualifier: qualifier.into(),
            value: value.into(),
            timestamp_micros: 0,
        }
    }

    pub fn with_timestamp(mut self, timestamp_micros: i64) -> Self {
        self.timestamp_micros = timestamp_micros;
        self
    }

    pub fn qualifier_lossy(&self) -> String {
        String::from_utf8_lossy(&self.qualifier).into_owned()
    }

    pub fn value_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// One row read from (or written to) a table: a key plus the cells of each
/// column family. Families are kept sorted for deterministic read-back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowRecord {
    key: Vec<u8>,
    families: BTreeMap<String, Vec<RowCell>>,
}

impl RowRecord {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            families: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn key_lossy(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }

    /// Appends a cell to the named family, creating the family entry if needed.
    pub fn push_cell(&mut self, family: &str, cell: RowCell) {
        self.families.entry(family.to_string()).or_default().push(cell);
    }

    /// Builder-style variant of [`push_cell`](Self::push_cell).
    pub fn with_cell(mut self, family: &str, cell: RowCell) -> Self {
        self.push_cell(family, cell);
        self
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    pub fn cells(&self, family: &str) -> &[RowCell] {
        self.families.get(family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All (family, cell) pairs in family order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (&str, &RowCell)> {
        self.families
            .iter()
            .flat_map(|(family, cells)| cells.iter().map(move |c| (family.as_str(), c)))
    }

    pub fn cell_count(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Merges another record with the same key into this one.
    pub fn merge(&mut self, other: RowRecord) {
        debug_assert_eq!(self.key, other.key);
        for (family, cells) in other.families {
            self.families.entry(family).or_default().extend(cells);
        }
    }
}
