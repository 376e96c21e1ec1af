//! CSV decoding into ordered string records.

use indexmap::IndexMap;

/// One input row: an ordered column name to string value mapping. Column
/// names are already normalized when a record is built.
pub type RawRecord = IndexMap<String, String>;

/// A decoded CSV input: normalized column names plus one [`RawRecord`] per
/// row, in file order. All values are kept as strings; the lake's table
/// schema is string-typed throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl Dataset {
    /// Decode CSV bytes. Column names are trimmed and lower-cased before
    /// anything else looks at them. Ragged rows are a decode error.
    pub fn from_csv_bytes(bytes: &[u8]) -> crate::Result<Self> {
        let mut reader = csv::ReaderBuilder::new().from_reader(bytes);
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(normalize_column_name)
            .collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let record: RawRecord = columns
                .iter()
                .cloned()
                .zip(row.iter().map(str::to_string))
                .collect();
            records.push(record);
        }

        Ok(Self { columns, records })
    }
}

fn normalize_column_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}
