//! Object store path layout for version partitions.
//!
//! A partition's location is a pure function of the base prefix and the
//! [`CanonicalVersion`], never of time or run id, so repeated conversion
//! runs append into the same prefix instead of fragmenting it. The folder
//! token extraction used by the discoverer lives next to the constructors so
//! the two directions cannot drift apart.

use crate::version::CanonicalVersion;
use chrono::{DateTime, Utc};
use object_store::path::Path as ObjPath;
use std::ops::Deref;

/// File extension for converted partition files
pub const PARQUET_FILE_EXTENSION: &str = "parquet";

/// Literal marker that starts every version partition folder name
pub const PARTITION_DIR_MARKER: &str = "Record_";

/// Directory prefix owning every object of one version partition,
/// `{base_prefix}/Record_{version}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDirPath(ObjPath);

impl PartitionDirPath {
    pub fn new(base_prefix: &str, version: &CanonicalVersion) -> Self {
        Self(ObjPath::from(format!(
            "{base_prefix}/{PARTITION_DIR_MARKER}{version}"
        )))
    }
}

impl Deref for PartitionDirPath {
    type Target = ObjPath;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ObjPath> for PartitionDirPath {
    fn as_ref(&self) -> &ObjPath {
        &self.0
    }
}

/// Path of one converted file inside a version partition,
/// `{base_prefix}/Record_{version}/{source_stem}_{UTC timestamp}.parquet`.
///
/// Only the file name carries the write time; the enclosing directory is
/// fully determined by the version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFilePath(ObjPath);

impl PartitionFilePath {
    pub fn new(
        base_prefix: &str,
        version: &CanonicalVersion,
        source_stem: &str,
        written_at: DateTime<Utc>,
    ) -> Self {
        Self(ObjPath::from(format!(
            "{base_prefix}/{PARTITION_DIR_MARKER}{version}/{source_stem}_{}.{}",
            written_at.format("%Y%m%d_%H%M%S"),
            PARQUET_FILE_EXTENSION
        )))
    }
}

impl Deref for PartitionFilePath {
    type Target = ObjPath;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ObjPath> for PartitionFilePath {
    fn as_ref(&self) -> &ObjPath {
        &self.0
    }
}

/// Extract the raw folder token following the first [`PARTITION_DIR_MARKER`]
/// in `key`, up to the next path separator.
///
/// Returns `None` for keys without the marker. The token is returned as
/// found; callers normalize it with [`CanonicalVersion::normalize`].
pub fn partition_dir_token(key: &str) -> Option<&str> {
    let (_, rest) = key.split_once(PARTITION_DIR_MARKER)?;
    rest.split('/').next()
}

/// Base name of an object key with the final extension removed, used as the
/// stem of converted file names.
pub fn source_stem(key: &str) -> &str {
    let base = key.rsplit('/').next().unwrap_or(key);
    match base.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => base,
    }
}
