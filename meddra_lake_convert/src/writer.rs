//! Persisting encoded version partitions to object storage.

use crate::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use meddra_lake_types::paths::PartitionFilePath;
use meddra_lake_types::CanonicalVersion;
use object_store::path::Path as ObjPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};
use std::sync::Arc;
use tracing::info;

/// One partition file actually written by a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PersistedPartition {
    pub version: CanonicalVersion,
    pub rows: usize,
    pub location: String,
}

/// Writes encoded blobs into their version-addressed location under a fixed
/// output prefix. Each write is a single create-or-overwrite put; writes for
/// different versions are independent of each other.
#[derive(Debug)]
pub struct PartitionWriter {
    object_store: Arc<dyn ObjectStore>,
    output_prefix: String,
}

impl PartitionWriter {
    pub fn new(object_store: Arc<dyn ObjectStore>, output_prefix: impl Into<String>) -> Self {
        Self {
            object_store,
            output_prefix: output_prefix.into(),
        }
    }

    /// Write one version's blob, returning the location written. The
    /// directory is determined by the version alone; only the file name
    /// carries the run timestamp.
    pub async fn write(
        &self,
        version: &CanonicalVersion,
        blob: Bytes,
        source_stem: &str,
        written_at: DateTime<Utc>,
    ) -> Result<ObjPath> {
        let path = PartitionFilePath::new(&self.output_prefix, version, source_stem, written_at);
        let bytes = blob.len();
        let opts = PutOptions {
            attributes: Attributes::from_iter([(
                Attribute::ContentType,
                "application/octet-stream",
            )]),
            ..Default::default()
        };
        self.object_store
            .put_opts(&path, blob.into(), opts)
            .await?;
        info!(%version, location = %path.as_ref(), bytes, "wrote partition file");
        Ok(path.as_ref().clone())
    }
}
