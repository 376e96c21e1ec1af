//! Rediscovery of version partitions from what storage actually contains.

use crate::Result;
use futures::StreamExt;
use meddra_lake_types::paths::partition_dir_token;
use meddra_lake_types::CanonicalVersion;
use object_store::path::Path as ObjPath;
use object_store::ObjectStore;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Scan every object key under `base_prefix` and collect the canonical
/// versions that currently have at least one object in storage.
///
/// Keys without the partition marker are ignored. Folder tokens are run
/// through the same normalizer the converter used to name them, so
/// `Record_3/` and `Record_3.0/` land on one entry. A token that fails
/// normalization names a folder this system didn't write; it is logged and
/// skipped, never registered.
pub async fn discover_versions(
    object_store: &dyn ObjectStore,
    base_prefix: &str,
) -> Result<BTreeSet<CanonicalVersion>> {
    let prefix = ObjPath::from(base_prefix);
    let mut versions = BTreeSet::new();

    let mut listing = object_store.list(Some(&prefix));
    while let Some(meta) = listing.next().await {
        let key = meta?.location;
        let Some(token) = partition_dir_token(key.as_ref()) else {
            continue;
        };
        match CanonicalVersion::normalize(token) {
            Ok(version) => {
                versions.insert(version);
            }
            Err(error) => {
                warn!(key = %key, %error, "ignoring partition folder with unnormalizable version token");
            }
        }
    }

    debug!(count = versions.len(), "discovered versions in storage");
    Ok(versions)
}
