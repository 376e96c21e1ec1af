//! The ingestion/conversion pipeline of the MedDRA lake.
//!
//! A storage-write notification triggers one single-threaded run: fetch the
//! raw CSV, split its rows by canonical MedDRA version, encode each split as
//! Parquet and write it under the version's partition prefix. The catalog
//! pipeline in `meddra_lake_catalog` independently rediscovers those
//! partitions from storage; the two sides only agree because both use the
//! normalizer and path layout from `meddra_lake_types`.
//!
//! A run has exactly one fatal failure mode (no identifiable version
//! column). Everything else (a rejected row, an unencodable group, a failed
//! write) is confined to its item and reported in the run outcome.

pub mod converter;
pub mod dataset;
pub mod writer;

use crate::converter::split_by_version;
use crate::dataset::Dataset;
use crate::writer::{PartitionWriter, PersistedPartition};
use chrono::Utc;
use meddra_lake_types::paths::source_stem;
use meddra_lake_types::{CanonicalVersion, ObjectEvent, StorageNotification};
use object_store::path::Path as ObjPath;
use object_store::ObjectStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no version column found in input header")]
    VersionColumnNotFound,

    #[error("csv decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What one conversion run did, as an inspectable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// The triggering object is not a CSV file; nothing was read.
    Skipped,
    /// No rows survived version cleaning; zero partitions were produced.
    NoValidRows,
    Converted(ConversionReport),
}

/// Per-partition results of a completed conversion run. `partitions` lists
/// what was actually written; `failed_versions` lists groups that failed to
/// encode or write and were skipped without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub partitions: Vec<PersistedPartition>,
    pub failed_versions: Vec<CanonicalVersion>,
    pub dropped_rows: usize,
}

/// One conversion run per triggering event: fetch, split, encode, write,
/// report.
#[derive(Debug)]
pub struct ConversionPipeline {
    source_store: Arc<dyn ObjectStore>,
    writer: PartitionWriter,
}

impl ConversionPipeline {
    /// `source_store` holds the raw input objects; converted partitions go
    /// to `output_store` under `output_prefix`.
    pub fn new(
        source_store: Arc<dyn ObjectStore>,
        output_store: Arc<dyn ObjectStore>,
        output_prefix: impl Into<String>,
    ) -> Self {
        Self {
            source_store,
            writer: PartitionWriter::new(output_store, output_prefix),
        }
    }

    /// Entry point for a raw storage notification: process its first record,
    /// or nothing when the notification carries none.
    pub async fn handle_notification(
        &self,
        notification: &StorageNotification,
    ) -> Result<Option<ConversionOutcome>> {
        match notification.primary_event() {
            Some(event) => Ok(Some(self.handle(event).await?)),
            None => Ok(None),
        }
    }

    pub async fn handle(&self, event: &ObjectEvent) -> Result<ConversionOutcome> {
        let key = event.decoded_key();
        info!(bucket = %event.bucket, %key, "processing file");

        if !key.to_lowercase().ends_with(".csv") {
            info!(%key, "skipped: not a CSV file");
            return Ok(ConversionOutcome::Skipped);
        }

        let bytes = self
            .source_store
            .get(&ObjPath::from(key.as_str()))
            .await?
            .bytes()
            .await?;
        let dataset = Dataset::from_csv_bytes(&bytes)?;
        info!(rows = dataset.records.len(), columns = ?dataset.columns, "rows loaded");

        let split = split_by_version(dataset)?;
        if split.groups.is_empty() {
            info!("no valid rows after version cleaning");
            return Ok(ConversionOutcome::NoValidRows);
        }

        let stem = source_stem(&key).to_string();
        let written_at = Utc::now();
        let mut partitions = Vec::new();
        let mut failed_versions = Vec::new();
        for (version, records) in &split.groups {
            let written = match converter::encode_version_group(&split.columns, records) {
                Ok(blob) => {
                    self.writer
                        .write(version, blob, &stem, written_at)
                        .await
                }
                Err(e) => Err(e),
            };
            match written {
                Ok(location) => partitions.push(PersistedPartition {
                    version: version.clone(),
                    rows: records.len(),
                    location: location.to_string(),
                }),
                Err(error) => {
                    error!(%version, %error, "failed to convert version group, skipping it");
                    failed_versions.push(version.clone());
                }
            }
        }

        Ok(ConversionOutcome::Converted(ConversionReport {
            partitions,
            failed_versions,
            dropped_rows: split.dropped_rows,
        }))
    }
}
