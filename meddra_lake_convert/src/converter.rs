//! Splitting a dataset by canonical version and encoding each split to
//! Parquet.

use crate::dataset::{Dataset, RawRecord};
use crate::{Error, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use meddra_lake_types::CanonicalVersion;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// The outcome of partitioning a dataset by version: surviving rows grouped
/// under their canonical version, in version order, with original relative
/// row order kept inside each group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSplit {
    pub columns: Vec<String>,
    pub version_column: String,
    pub groups: BTreeMap<CanonicalVersion, Vec<RawRecord>>,
    pub dropped_rows: usize,
}

/// Group a dataset's rows by canonical version.
///
/// The version-bearing column is the first whose normalized name contains
/// `"version"`; a dataset without one cannot be partitioned at all, which is
/// the single fatal case of a conversion run. Rows whose token rejects are
/// dropped. The canonical string is written back into each surviving row so
/// the stored data carries the cleaned value, not the raw token.
pub fn split_by_version(dataset: Dataset) -> Result<VersionSplit> {
    let version_column = dataset
        .columns
        .iter()
        .find(|name| name.contains("version"))
        .cloned()
        .ok_or(Error::VersionColumnNotFound)?;
    debug!(column = %version_column, "using version column");

    let mut groups: BTreeMap<CanonicalVersion, Vec<RawRecord>> = BTreeMap::new();
    let mut dropped_rows = 0;
    for mut record in dataset.records {
        let token = record
            .get(&version_column)
            .map(String::as_str)
            .unwrap_or_default();
        match CanonicalVersion::normalize(token) {
            Ok(version) => {
                record.insert(version_column.clone(), version.to_string());
                groups.entry(version).or_default().push(record);
            }
            Err(_) => dropped_rows += 1,
        }
    }
    if dropped_rows > 0 {
        debug!(dropped_rows, "dropped rows with unnormalizable version tokens");
    }

    Ok(VersionSplit {
        columns: dataset.columns,
        version_column,
        groups,
        dropped_rows,
    })
}

/// Encode one version group as a Snappy-compressed Parquet blob, all columns
/// string-typed, in the dataset's column order.
pub fn encode_version_group(columns: &[String], records: &[RawRecord]) -> Result<Bytes> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|name| {
            let values: Vec<Option<&str>> = records
                .iter()
                .map(|record| record.get(name).map(String::as_str))
                .collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(Bytes::from(buffer))
}
